//! ICY (shoutcast) stream reader
//!
//! Connects to an internet-radio endpoint with `Icy-MetaData: 1` and strips
//! the interleaved metadata blocks from the byte stream, so downstream
//! consumers see pure MP3 frames. Title changes found in the metadata are
//! reported through a callback, deduplicated against the last reported title.
//!
//! Wire format: the server sends `icy-metaint` audio bytes, then one length
//! byte L, then L*16 bytes of metadata (`StreamTitle='...';`, zero-padded).
//! A length byte of 0 means no metadata in this block.

use crate::error::{Error, Result};
use std::io::Read;
use std::time::Duration;
use tracing::{debug, info, warn};
use ureq::Agent;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Title-change callback. Invoked from the thread driving the reader.
pub type TitleCallback = Box<dyn FnMut(&str) + Send>;

/// Connect to `url` and return a reader yielding the audio bytes with
/// metadata blocks stripped.
///
/// No global timeout is set on the agent: the stream is endless by design
/// and only the connect phase is bounded.
pub fn open(url: &str, on_title: TitleCallback) -> Result<IcyReader<Box<dyn Read + Send>>> {
    let config = Agent::config_builder()
        .timeout_connect(Some(CONNECT_TIMEOUT))
        .build();
    let agent: Agent = config.into();

    let response = agent
        .get(url)
        .header("Icy-MetaData", "1")
        .call()
        .map_err(|e| Error::Connect(format!("{}: {}", url, e)))?;

    let (parts, body) = response.into_parts();
    if !parts.status.is_success() {
        return Err(Error::Connect(format!(
            "{}: unexpected status {}",
            url, parts.status
        )));
    }

    let metaint = parts
        .headers
        .get("icy-metaint")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<usize>().ok());

    match metaint {
        Some(n) => debug!("connected to {} (icy-metaint {})", url, n),
        None => info!("connected to {} (no icy metadata)", url),
    }

    // Endless stream: lift the default body size limit.
    let reader: Box<dyn Read + Send> = Box::new(
        body.into_with_config().limit(u64::MAX).reader(),
    );
    Ok(IcyReader::new(reader, metaint, on_title))
}

/// Reader adapter that strips ICY metadata blocks from the raw stream.
pub struct IcyReader<R> {
    inner: R,
    /// Audio bytes between metadata blocks; `None` disables stripping
    metaint: Option<usize>,
    /// Audio bytes remaining until the next metadata block
    until_meta: usize,
    on_title: TitleCallback,
    last_title: Option<String>,
}

impl<R: Read> IcyReader<R> {
    pub fn new(inner: R, metaint: Option<usize>, on_title: TitleCallback) -> Self {
        Self {
            inner,
            metaint,
            until_meta: metaint.unwrap_or(0),
            on_title,
            last_title: None,
        }
    }

    /// Consume one metadata block (length byte plus payload) and report any
    /// title change. Returns `false` on a clean end of stream at the block
    /// boundary.
    fn read_metadata_block(&mut self) -> std::io::Result<bool> {
        let mut len_byte = [0u8; 1];
        if self.inner.read(&mut len_byte)? == 0 {
            return Ok(false);
        }
        let len = len_byte[0] as usize * 16;
        if len == 0 {
            return Ok(true);
        }

        let mut block = vec![0u8; len];
        self.inner.read_exact(&mut block)?;

        let text = String::from_utf8_lossy(&block);
        let text = text.trim_end_matches('\0');
        if let Some(title) = parse_stream_title(text) {
            if self.last_title.as_deref() != Some(title) {
                debug!("stream title changed: {:?}", title);
                self.last_title = Some(title.to_string());
                (self.on_title)(title);
            }
        } else if !text.is_empty() {
            warn!("unrecognized icy metadata: {:?}", text);
        }
        Ok(true)
    }
}

impl<R: Read> Read for IcyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let metaint = match self.metaint {
            Some(n) if n > 0 => n,
            _ => return self.inner.read(buf),
        };

        if self.until_meta == 0 {
            if !self.read_metadata_block()? {
                return Ok(0);
            }
            self.until_meta = metaint;
        }

        let want = buf.len().min(self.until_meta);
        let n = self.inner.read(&mut buf[..want])?;
        self.until_meta -= n;
        Ok(n)
    }
}

/// Extract the title from a `StreamTitle='...';` metadata string.
fn parse_stream_title(meta: &str) -> Option<&str> {
    let rest = meta.strip_prefix("StreamTitle='")?;
    let end = rest.find("';")?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    fn meta_block(title: &str) -> Vec<u8> {
        let payload = format!("StreamTitle='{}';", title);
        let len = payload.len().div_ceil(16);
        let mut block = vec![len as u8];
        block.extend_from_slice(payload.as_bytes());
        block.resize(1 + len * 16, 0);
        block
    }

    fn collect_titles() -> (Arc<Mutex<Vec<String>>>, TitleCallback) {
        let titles = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&titles);
        let cb: TitleCallback = Box::new(move |t| sink.lock().unwrap().push(t.to_string()));
        (titles, cb)
    }

    #[test]
    fn parses_stream_title() {
        assert_eq!(
            parse_stream_title("StreamTitle='Artist - Song';"),
            Some("Artist - Song")
        );
        assert_eq!(parse_stream_title("StreamUrl='x';"), None);
        assert_eq!(parse_stream_title(""), None);
    }

    #[test]
    fn strips_metadata_and_reports_titles() {
        // metaint 4: [4 audio][meta "Song1"][4 audio][meta len=0][4 audio]
        let mut raw = Vec::new();
        raw.extend_from_slice(b"aaaa");
        raw.extend_from_slice(&meta_block("Song1"));
        raw.extend_from_slice(b"bbbb");
        raw.push(0); // empty metadata block
        raw.extend_from_slice(b"cccc");

        let (titles, cb) = collect_titles();
        let mut reader = IcyReader::new(Cursor::new(raw), Some(4), cb);

        let mut audio = Vec::new();
        reader.read_to_end(&mut audio).unwrap();

        assert_eq!(audio, b"aaaabbbbcccc");
        assert_eq!(*titles.lock().unwrap(), vec!["Song1"]);
    }

    #[test]
    fn repeated_title_reported_once() {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"xx");
        raw.extend_from_slice(&meta_block("Same"));
        raw.extend_from_slice(b"yy");
        raw.extend_from_slice(&meta_block("Same"));
        raw.extend_from_slice(b"zz");
        raw.extend_from_slice(&meta_block("Next"));
        raw.extend_from_slice(b"ww");

        let (titles, cb) = collect_titles();
        let mut reader = IcyReader::new(Cursor::new(raw), Some(2), cb);

        let mut audio = Vec::new();
        reader.read_to_end(&mut audio).unwrap();

        assert_eq!(audio, b"xxyyzzww");
        assert_eq!(*titles.lock().unwrap(), vec!["Same", "Next"]);
    }

    #[test]
    fn no_metaint_passes_bytes_through() {
        let (titles, cb) = collect_titles();
        let mut reader = IcyReader::new(Cursor::new(b"rawbytes".to_vec()), None, cb);

        let mut audio = Vec::new();
        reader.read_to_end(&mut audio).unwrap();

        assert_eq!(audio, b"rawbytes");
        assert!(titles.lock().unwrap().is_empty());
    }

    #[test]
    fn small_reads_stay_aligned_with_metadata() {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"abcd");
        raw.extend_from_slice(&meta_block("T"));
        raw.extend_from_slice(b"efgh");

        let (titles, cb) = collect_titles();
        let mut reader = IcyReader::new(Cursor::new(raw), Some(4), cb);

        let mut audio = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match reader.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => audio.push(byte[0]),
                Err(e) => panic!("{}", e),
            }
        }

        assert_eq!(audio, b"abcdefgh");
        assert_eq!(*titles.lock().unwrap(), vec!["T"]);
    }
}
