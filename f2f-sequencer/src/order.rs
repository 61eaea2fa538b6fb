use std::fs;
use std::path::{Path, PathBuf};

use f2f_core::{DataError, EmotionQuadrant, ParticipantId, StimulusId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;
use tracing::{debug, info};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed stimulus order: {0}")]
    Data(#[from] DataError),

    #[error("stimulus order {path} is empty")]
    Empty { path: PathBuf },
}

/// Per-participant stimulus order, fixed for the whole session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StimulusOrder {
    items: Vec<StimulusId>,
}

/// `{order_dir}/p{participant:02}_stimuli.csv`
pub fn order_path(order_dir: &Path, participant: ParticipantId) -> PathBuf {
    order_dir.join(format!("p{}_stimuli.csv", participant.padded()))
}

impl StimulusOrder {
    pub fn new(items: Vec<StimulusId>) -> Self {
        Self { items }
    }

    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, DataError> {
        let items = names
            .into_iter()
            .map(StimulusId::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { items })
    }

    /// Reads the first field of every row. Extra fields and blank rows are ignored.
    pub fn read(path: &Path) -> Result<Self, OrderError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut items = Vec::new();
        for record in reader.records() {
            let record = record?;
            match record.get(0).map(str::trim) {
                Some(name) if !name.is_empty() => items.push(StimulusId::parse(name)?),
                _ => continue,
            }
        }

        if items.is_empty() {
            return Err(OrderError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(Self { items })
    }

    pub fn write(&self, path: &Path) -> Result<(), OrderError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| OrderError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        for id in &self.items {
            writer.write_record([id.file_name()])?;
        }
        writer.flush().map_err(|source| OrderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Builds a shuffled order from the images in `stimuli_dir`.
    ///
    /// Files whose name does not start with a quadrant code are not stimuli
    /// and are skipped. The shuffle is seeded, so a participant always gets
    /// the same order from the same directory.
    pub fn generate(
        stimuli_dir: &Path,
        seed: u64,
        per_quadrant: Option<usize>,
    ) -> Result<Self, OrderError> {
        let entries = fs::read_dir(stimuli_dir).map_err(|source| OrderError::Io {
            path: stimuli_dir.to_path_buf(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| OrderError::Io {
                    path: stimuli_dir.to_path_buf(),
                    source,
                })?
                .path();
            if !path.is_file() || !is_image(&path) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();

        let mut candidates = Vec::with_capacity(names.len());
        for name in &names {
            match StimulusId::parse(name) {
                Ok(id) => candidates.push(id),
                Err(e) => debug!("skipping {name}: {e}"),
            }
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut items = Vec::with_capacity(candidates.len());
        for quadrant in EmotionQuadrant::ALL {
            let mut group: Vec<_> = candidates
                .iter()
                .filter(|id| id.quadrant() == quadrant)
                .cloned()
                .collect();
            group.shuffle(&mut rng);
            if let Some(k) = per_quadrant {
                group.truncate(k);
            }
            items.extend(group);
        }
        items.shuffle(&mut rng);

        if items.is_empty() {
            return Err(OrderError::Empty {
                path: stimuli_dir.to_path_buf(),
            });
        }
        Ok(Self { items })
    }

    /// Loads the order at `path`, generating and saving one first if the file
    /// does not exist yet.
    pub fn load_or_prepare(
        path: &Path,
        stimuli_dir: &Path,
        participant: ParticipantId,
        per_quadrant: Option<usize>,
    ) -> Result<Self, OrderError> {
        if !path.exists() {
            info!(
                "no stimulus order at {}, generating one from {}",
                path.display(),
                stimuli_dir.display()
            );
            let order = Self::generate(stimuli_dir, participant.0 as u64, per_quadrant)?;
            order.write(path)?;
        }
        Self::read(path)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StimulusId> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StimulusId> {
        self.items.iter()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), b"").unwrap();
        }
    }

    fn names(order: &StimulusOrder) -> Vec<String> {
        order.iter().map(|id| id.file_name().to_string()).collect()
    }

    #[test]
    fn path_uses_padded_participant() {
        assert_eq!(
            order_path(Path::new("stimuli/f2f"), ParticipantId(3)),
            PathBuf::from("stimuli/f2f/p03_stimuli.csv")
        );
    }

    #[test]
    fn reads_first_field_and_skips_blank_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p00_stimuli.csv");
        fs::write(&path, "1a.jpg,extra\n\n3b.jpg\n").unwrap();

        let order = StimulusOrder::read(&path).unwrap();
        assert_eq!(names(&order), ["1a.jpg", "3b.jpg"]);
    }

    #[test]
    fn bad_code_fails_the_whole_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p00_stimuli.csv");
        fs::write(&path, "1a.jpg\n9z.jpg\n").unwrap();

        let err = StimulusOrder::read(&path).unwrap_err();
        assert!(matches!(
            err,
            OrderError::Data(DataError::UnknownEmotionCode { code: '9', .. })
        ));
    }

    #[test]
    fn empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p00_stimuli.csv");
        fs::write(&path, "\n").unwrap();
        assert!(matches!(
            StimulusOrder::read(&path),
            Err(OrderError::Empty { .. })
        ));
    }

    #[test]
    fn generation_is_seeded_and_filters_non_stimuli() {
        let dir = tempfile::tempdir().unwrap();
        touch(
            dir.path(),
            &["1a.jpg", "1b.jpg", "2a.png", "3a.JPG", "4a.jpeg", "readme.txt", "x.jpg"],
        );

        let a = StimulusOrder::generate(dir.path(), 7, None).unwrap();
        let b = StimulusOrder::generate(dir.path(), 7, None).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
        assert!(!names(&a).contains(&"x.jpg".to_string()));

        let limited = StimulusOrder::generate(dir.path(), 7, Some(1)).unwrap();
        assert_eq!(limited.len(), 4);
        for q in EmotionQuadrant::ALL {
            assert_eq!(limited.iter().filter(|id| id.quadrant() == q).count(), 1);
        }
    }

    #[test]
    fn missing_order_is_prepared_then_reused() {
        let stimuli = tempfile::tempdir().unwrap();
        touch(stimuli.path(), &["1a.jpg", "2b.jpg", "3c.jpg"]);
        let orders = tempfile::tempdir().unwrap();
        let path = order_path(&orders.path().join("f2f"), ParticipantId(4));

        let first =
            StimulusOrder::load_or_prepare(&path, stimuli.path(), ParticipantId(4), None).unwrap();
        assert!(path.exists());

        // A hand-edited file wins over regeneration.
        fs::write(&path, "4d.jpg\n").unwrap();
        let second =
            StimulusOrder::load_or_prepare(&path, stimuli.path(), ParticipantId(4), None).unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(names(&second), ["4d.jpg"]);
    }
}
