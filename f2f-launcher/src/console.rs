use std::io::{self, BufRead, Write};

pub const QUIT_COMMAND: &str = "qt";

/// Blocks until the operator types `qt`. End of input counts as quitting.
pub fn wait_for_quit<R: BufRead, W: Write>(mut input: R, mut prompt: W) -> io::Result<()> {
    let mut line = String::new();
    loop {
        write!(prompt, "Please enter {QUIT_COMMAND} to stop: ")?;
        prompt.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(());
        }
        if line.trim() == QUIT_COMMAND {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn other_input_is_ignored_until_quit() {
        let mut out = Vec::new();
        wait_for_quit(Cursor::new("start\n q\nqt\nleftover\n"), &mut out).unwrap();
        let prompts = String::from_utf8(out).unwrap();
        assert_eq!(prompts.matches("Please enter qt").count(), 3);
    }

    #[test]
    fn eof_ends_the_wait() {
        wait_for_quit(Cursor::new(""), io::sink()).unwrap();
    }
}
