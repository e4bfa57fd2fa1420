//! Streaming armor decoder.

use std::io::{self, BufRead, BufReader, Read};

use super::{parse_frame_line, ArmorMarker, ARMOR_ALPHABET};
use crate::error::{Error, Result};

/// Longest header or footer line accepted, in bytes
const MAX_FRAME_LINE: usize = 512;

/// Dearmors an envelope read from `inner`
///
/// The header is parsed on construction, so [`ArmoredReader::marker`] is
/// available before any payload is read. The footer is checked as soon as
/// the body's terminating `.` is reached.
pub struct ArmoredReader<R: Read> {
    inner: BufReader<R>,
    app: Option<String>,
    marker: ArmorMarker,
    group: Vec<char>,
    decoded: Vec<u8>,
    pos: usize,
    body_done: bool,
}

impl<R: Read> ArmoredReader<R> {
    /// Parse the header, requiring its application name to equal `app`
    ///
    /// ## Errors
    ///
    /// `FormatError` when no well-formed header is found or the application
    /// name differs (including one side having a name and the other not).
    pub fn new(inner: R, app: Option<&str>) -> Result<Self> {
        let mut reader = Self {
            inner: BufReader::new(inner),
            app: app.map(str::to_string),
            marker: ArmorMarker::EncryptedMessage,
            group: Vec::with_capacity(ARMOR_ALPHABET.group_chars()),
            decoded: Vec::new(),
            pos: 0,
            body_done: false,
        };

        let line = reader
            .read_frame_line()?
            .ok_or_else(|| Error::format("Armor header not found"))?;
        let (found_app, marker) = parse_frame_line("BEGIN", &line)?;
        if found_app.as_deref() != app {
            return Err(Error::format(format!(
                "Armor application name mismatch: expected {:?}, found {:?}",
                app, found_app
            )));
        }
        reader.marker = marker;

        Ok(reader)
    }

    /// The marker announced by the header
    pub fn marker(&self) -> ArmorMarker {
        self.marker
    }

    /// Require that the whole body was consumed and the footer verified
    ///
    /// ## Errors
    ///
    /// `FormatError` if decoded payload bytes remain unread.
    pub fn finish(&mut self) -> Result<()> {
        loop {
            if self.pos < self.decoded.len() {
                return Err(Error::format("Trailing data after the message"));
            }
            if self.body_done {
                return Ok(());
            }
            self.fill()?;
        }
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = match self.inner.fill_buf()?.first() {
            Some(&b) => b,
            None => return Ok(None),
        };
        self.inner.consume(1);
        Ok(Some(byte))
    }

    /// Read up to the next '.', with quoting removed; `None` on clean EOF
    fn read_frame_line(&mut self) -> Result<Option<String>> {
        let mut line = Vec::new();
        loop {
            match self.next_byte()? {
                None => return Ok(None),
                Some(b'.') => break,
                Some(_) if line.len() >= MAX_FRAME_LINE => {
                    return Err(Error::format("Armor frame line too long"));
                }
                Some(b'>') => line.push(b' '),
                Some(b) => line.push(b),
            }
        }
        String::from_utf8(line)
            .map(Some)
            .map_err(|_| Error::format("Armor frame line is not ASCII"))
    }

    /// Decode at least one more group, or reach the end of the body
    fn fill(&mut self) -> Result<()> {
        self.decoded.clear();
        self.pos = 0;

        loop {
            match self.next_byte()? {
                None => return Err(Error::format("Armor footer not found")),
                Some(b'.') => {
                    ARMOR_ALPHABET.decode_group_if_any(&self.group, &mut self.decoded)?;
                    self.group.clear();
                    self.body_done = true;
                    return self.check_footer();
                }
                Some(b) if b.is_ascii_whitespace() || b == b'>' => continue,
                Some(b) => {
                    self.group.push(char::from(b));
                    if self.group.len() == ARMOR_ALPHABET.group_chars() {
                        ARMOR_ALPHABET.decode_group(&self.group, &mut self.decoded)?;
                        self.group.clear();
                        return Ok(());
                    }
                }
            }
        }
    }

    fn check_footer(&mut self) -> Result<()> {
        let line = self
            .read_frame_line()?
            .ok_or_else(|| Error::format("Armor footer not found"))?;
        let (app, marker) = parse_frame_line("END", &line)?;
        if app != self.app || marker != self.marker {
            return Err(Error::format("Armor footer does not match the header"));
        }
        Ok(())
    }
}

impl<R: Read> Read for ArmoredReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos == self.decoded.len() {
            if self.body_done || buf.is_empty() {
                return Ok(0);
            }
            self.fill()?;
        }

        let n = buf.len().min(self.decoded.len() - self.pos);
        buf[..n].copy_from_slice(&self.decoded[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
