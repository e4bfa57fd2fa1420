//! Streaming armor encoder.

use std::io::{self, Write};

use super::{frame_line, ArmorConfig, ArmorMarker, ARMOR_ALPHABET};
use crate::config::WordWrap;
use crate::error::Result;

/// Armors everything written to it into `inner`
///
/// The header is written on construction. Call [`ArmoredWriter::finish`]
/// once all payload bytes are written to flush the last partial group and
/// the footer; dropping the writer without it leaves the envelope open.
pub struct ArmoredWriter<W: Write> {
    inner: W,
    group: Vec<u8>,
    wrap: WordWrap,
    letters_written: usize,
    footer: String,
    finished: bool,
}

impl<W: Write> ArmoredWriter<W> {
    /// Start an envelope, writing the header immediately
    ///
    /// Fails with `InvalidArgument` for a zero word grouping or an app name
    /// that is not a single alphanumeric word.
    pub fn new(mut inner: W, marker: ArmorMarker, config: &ArmorConfig) -> Result<Self> {
        config.validate()?;
        let app = config.app.as_deref();
        write!(inner, "{}. ", frame_line("BEGIN", app, marker))?;

        Ok(Self {
            inner,
            group: Vec::with_capacity(ARMOR_ALPHABET.group_bytes()),
            wrap: config.word_wrap,
            letters_written: 0,
            footer: format!(". {}.", frame_line("END", app, marker)),
            finished: false,
        })
    }

    /// Encode the buffered group and write its letters with separators
    fn flush_group(&mut self) -> io::Result<()> {
        if self.group.is_empty() {
            return Ok(());
        }

        let mut letters = String::with_capacity(ARMOR_ALPHABET.group_chars());
        ARMOR_ALPHABET.encode_group(&self.group, &mut letters);
        self.group.clear();

        let mut out = String::with_capacity(letters.len() * 2);
        for letter in letters.chars() {
            if self.letters_written > 0 && self.letters_written % self.wrap.letters_per_word == 0 {
                let word = self.letters_written / self.wrap.letters_per_word;
                out.push(if word % self.wrap.words_per_phrase == 0 { '\n' } else { ' ' });
            }
            out.push(letter);
            self.letters_written += 1;
        }

        self.inner.write_all(out.as_bytes())
    }

    /// Write the final group and the footer
    ///
    /// Idempotent: later calls do nothing.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.flush_group()?;
        self.inner.write_all(self.footer.as_bytes())?;
        self.inner.flush()?;
        self.finished = true;
        Ok(())
    }

    /// Whether the footer has been written
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Unwrap the underlying writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for ArmoredWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.finished {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "armor footer already written",
            ));
        }

        let group_bytes = ARMOR_ALPHABET.group_bytes();
        let mut rest = buf;
        while !rest.is_empty() {
            let take = (group_bytes - self.group.len()).min(rest.len());
            self.group.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.group.len() == group_bytes {
                self.flush_group()?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
