use f2f_render::{Overlay, SkiaRenderer, default_font};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use std::path::{Path, PathBuf};

const WIDTH: u32 = 1920;
const HEIGHT: u32 = 1080;

fn stimulus_image(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("1a.png");
    image::RgbaImage::from_fn(640, 480, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    })
    .save(&path)
    .unwrap();
    path
}

fn harness(image: &Path) -> (SkiaRenderer, Vec<u8>) {
    let mut r = SkiaRenderer::new(WIDTH, HEIGHT, default_font().unwrap()).unwrap();
    r.preload(image).unwrap();
    let fb = vec![0u8; (WIDTH * HEIGHT * 4) as usize];
    (r, fb)
}

pub fn bench_surface(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let image = stimulus_image(&dir);

    let mut g = c.benchmark_group("render_surface");
    g.sample_size(40);

    g.bench_function("cached_stimulus", |b| {
        b.iter_batched(
            || harness(&image),
            |(mut r, mut fb)| {
                let stats = r.render_frame(Some(image.as_path()), &Overlay::None, &mut fb);
                black_box(stats.unwrap().total);
            },
            BatchSize::LargeInput,
        )
    });

    g.bench_function("stimulus_with_timer_panel", |b| {
        let overlay = Overlay::Timer {
            label: "High-Valence, High-Arousal".into(),
            clock: "04:59".into(),
        };
        b.iter_batched(
            || harness(&image),
            |(mut r, mut fb)| {
                let stats = r.render_frame(Some(image.as_path()), &overlay, &mut fb);
                black_box(stats.unwrap().total);
            },
            BatchSize::LargeInput,
        )
    });

    g.finish();
}

criterion_group!(benches, bench_surface);
criterion_main!(benches);
