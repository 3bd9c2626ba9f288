//! Delimiter-based re-segmentation of a streamed text payload.
//!
//! An upstream model delivers text in arbitrarily sized fragments. Page
//! consumers want whole records instead, one per logical unit, where records
//! are separated by a blank line ([`SEPARATOR`]). [`Resegmenter`] buffers
//! fragments and hands back each record as soon as its closing separator has
//! arrived; [`resegment`] lifts the same logic over an async fragment stream.
//!
//! ```
//! use deckstream::segment::Resegmenter;
//!
//! let mut segmenter = Resegmenter::new();
//! assert_eq!(segmenter.feed("A\n"), Vec::<String>::new());
//! assert_eq!(segmenter.feed("\nB\n\nC"), vec!["A", "B"]);
//! assert_eq!(segmenter.flush().as_deref(), Some("C"));
//! ```

use futures::{Stream, StreamExt};

/// The record boundary marker.
pub const SEPARATOR: &str = "\n\n";

/// Buffers text fragments and splits them into separator-delimited records.
///
/// Each record is trimmed of surrounding whitespace. Segments that are empty
/// after trimming (for example between two consecutive separators) are
/// dropped rather than emitted as empty records. Single newlines inside a
/// record are kept.
///
/// The buffer is unbounded: an upstream that never sends a separator is
/// held in memory until [`flush`](Self::flush).
#[derive(Debug, Default)]
pub struct Resegmenter {
    buffer: String,
}

impl Resegmenter {
    /// Creates a re-segmenter with an empty pending buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `fragment` and returns every record completed by it, in order.
    pub fn feed(&mut self, fragment: &str) -> Vec<String> {
        self.buffer.push_str(fragment);
        let mut records = Vec::new();

        while let Some(end) = self.buffer.find(SEPARATOR) {
            let record = self.buffer[..end].trim();
            if !record.is_empty() {
                records.push(record.to_owned());
            }
            self.buffer.drain(..end + SEPARATOR.len());
        }

        records
    }

    /// Returns the text buffered since the last separator.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Consumes the re-segmenter, returning the trailing partial record if it
    /// holds anything besides whitespace.
    pub fn flush(self) -> Option<String> {
        let rest = self.buffer.trim();
        (!rest.is_empty()).then(|| rest.to_owned())
    }
}

/// Re-segments a fallible fragment stream into a stream of records.
///
/// Records are yielded as soon as they complete, and the trailing partial
/// record is flushed once `fragments` ends. If `fragments` yields an error,
/// that error is forwarded, the pending buffer is discarded, and the stream
/// ends without a flush.
pub fn resegment<S, E>(fragments: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<String, E>>,
{
    async_stream::stream! {
        let mut fragments = Box::pin(fragments);
        let mut segmenter = Resegmenter::new();

        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(fragment) => {
                    for record in segmenter.feed(&fragment) {
                        yield Ok(record);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        if let Some(record) = segmenter.flush() {
            yield Ok(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn feed_all(fragments: &[&str]) -> Vec<String> {
        let mut segmenter = Resegmenter::new();
        let mut records: Vec<String> = fragments.iter().flat_map(|f| segmenter.feed(f)).collect();
        records.extend(segmenter.flush());
        records
    }

    #[test]
    fn single_fragment_splits_on_blank_lines() {
        assert_eq!(feed_all(&["A\n\nB\n\nC"]), vec!["A", "B", "C"]);
    }

    #[test]
    fn separator_split_across_fragments() {
        assert_eq!(feed_all(&["A\n", "\n", "B\n\nC"]), vec!["A", "B", "C"]);
    }

    #[test]
    fn one_character_at_a_time() {
        let input = "{\"a\":1}\n\n{\"b\":\n2}\n\n{\"c\":3}";
        let chars: Vec<String> = input.chars().map(String::from).collect();
        let fragments: Vec<&str> = chars.iter().map(String::as_str).collect();
        assert_eq!(
            feed_all(&fragments),
            vec!["{\"a\":1}", "{\"b\":\n2}", "{\"c\":3}"]
        );
    }

    #[test]
    fn empty_segments_are_dropped() {
        assert_eq!(feed_all(&["A\n\n\n\nB"]), vec!["A", "B"]);
        assert_eq!(feed_all(&["\n\n  \n\nA\n\n"]), vec!["A"]);
    }

    #[test]
    fn trailing_partial_waits_for_flush() {
        let mut segmenter = Resegmenter::new();
        assert_eq!(segmenter.feed("X\n\nY"), vec!["X"]);
        assert_eq!(segmenter.pending(), "Y");
        assert_eq!(segmenter.flush().as_deref(), Some("Y"));
    }

    #[test]
    fn records_are_trimmed() {
        assert_eq!(feed_all(&["  X  \n\n  Y  "]), vec!["X", "Y"]);
    }

    #[test]
    fn single_newlines_stay_inside_a_record() {
        assert_eq!(feed_all(&["line one\nline two"]), vec!["line one\nline two"]);
    }

    #[test]
    fn whitespace_only_remainder_is_not_flushed() {
        let mut segmenter = Resegmenter::new();
        assert_eq!(segmenter.feed("A\n\n \n"), vec!["A"]);
        assert_eq!(segmenter.flush(), None);
    }

    #[test]
    fn nothing_is_lost_between_fragments() {
        let input = "alpha\nbeta\n\ngamma\n\ndelta";
        let expected = feed_all(&[input]);
        for split in 0..=input.len() {
            let (head, tail) = input.split_at(split);
            assert_eq!(feed_all(&[head, tail]), expected, "split at {split}");
        }
        assert_eq!(expected.join(SEPARATOR), input);
    }

    #[tokio::test]
    async fn stream_yields_records_in_order_and_flushes() {
        let fragments = stream::iter(vec![
            Ok::<_, String>("one\n".to_owned()),
            Ok("\ntwo\n\nthr".to_owned()),
            Ok("ee".to_owned()),
        ]);
        let records: Vec<_> = resegment(fragments).collect().await;
        assert_eq!(
            records,
            vec![Ok("one".to_owned()), Ok("two".to_owned()), Ok("three".to_owned())]
        );
    }

    #[tokio::test]
    async fn stream_failure_skips_flush() {
        let fragments = stream::iter(vec![
            Ok("done\n\npartial".to_owned()),
            Err("upstream reset"),
            Ok("never\n\n".to_owned()),
        ]);
        let records: Vec<_> = resegment(fragments).collect().await;
        assert_eq!(records, vec![Ok("done".to_owned()), Err("upstream reset")]);
    }

    #[tokio::test]
    async fn stream_failure_before_any_separator() {
        let fragments = stream::iter(vec![Ok("partial".to_owned()), Err(())]);
        let records: Vec<_> = resegment(fragments).collect().await;
        assert_eq!(records, vec![Err(())]);
    }
}
