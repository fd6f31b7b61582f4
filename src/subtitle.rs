//! WebVTT encoding and decoding.
//!
//! Documents are written as a `WEBVTT` header, a blank line, then one block per
//! cue: a `H:MM:SS.mmm --> H:MM:SS.mmm` timing line, a single text line and a
//! blank separator line.

use crate::error::{LecternError, Result};
use crate::transcribe::TranscriptSegment;

pub const HEADER: &str = "WEBVTT";
pub const TIMING_ARROW: &str = "-->";

/// Ordered cues of one subtitle file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubtitleDocument {
    pub cues: Vec<TranscriptSegment>,
}

impl SubtitleDocument {
    pub fn from_segments(segments: Vec<TranscriptSegment>) -> Self {
        Self { cues: segments }
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn encode(&self) -> String {
        let mut content = String::with_capacity(16 + self.cues.len() * 48);
        content.push_str(HEADER);
        content.push_str("\n\n");

        for cue in &self.cues {
            content.push_str(&format!(
                "{} {} {}\n{}\n\n",
                format_timestamp(cue.start),
                TIMING_ARROW,
                format_timestamp(cue.end),
                cue.text.trim()
            ));
        }

        content
    }

    /// Parse WebVTT text.
    ///
    /// Accepts a leading BOM, CRLF endings, cue identifiers and cue settings.
    /// Multi-line cue text is joined with single spaces. NOTE, STYLE and REGION
    /// blocks are skipped.
    pub fn decode(content: &str) -> Result<Self> {
        let lines: Vec<&str> = content.lines().collect();

        let first = lines
            .first()
            .map(|line| line.trim().trim_start_matches('\u{FEFF}'))
            .unwrap_or_default();
        if !first.starts_with(HEADER) {
            return Err(LecternError::SubtitleFormat("No WEBVTT header found".to_string()));
        }

        let mut cues = Vec::new();
        let mut i = 1;

        while i < lines.len() {
            let line = lines[i].trim();

            if line.is_empty() {
                i += 1;
                continue;
            }

            if line.starts_with("NOTE") || line.starts_with("STYLE") || line.starts_with("REGION") {
                i = skip_block(&lines, i);
                continue;
            }

            if !line.contains(TIMING_ARROW) {
                // cue identifier
                i += 1;
                continue;
            }

            let (start, end) = parse_timing_line(line)?;
            i += 1;

            let mut text_lines = Vec::new();
            while i < lines.len() && !lines[i].trim().is_empty() {
                text_lines.push(lines[i].trim());
                i += 1;
            }

            cues.push(TranscriptSegment::new(start, end, text_lines.join(" ")));
        }

        Ok(Self { cues })
    }
}

fn skip_block(lines: &[&str], mut index: usize) -> usize {
    index += 1;
    while index < lines.len() && !lines[index].trim().is_empty() {
        index += 1;
    }
    index
}

/// Whether a raw line carries cue text, as opposed to the header, a timing
/// line or a blank separator.
pub fn is_cue_text_line(line: &str) -> bool {
    !line.trim().is_empty() && !line.contains(TIMING_ARROW) && !line.contains(HEADER)
}

/// Format seconds as `H:MM:SS.mmm`.
///
/// The integer part is rendered as a wall-clock duration with unpadded hours;
/// the fractional part is rounded to milliseconds, carrying into the seconds
/// when it rounds up to 1000.
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };

    let whole = seconds.trunc();
    let mut total_secs = whole as u64;
    let mut millis = ((seconds - whole) * 1000.0).round() as u64;
    if millis >= 1000 {
        total_secs += 1;
        millis -= 1000;
    }

    format!(
        "{}:{:02}:{:02}.{:03}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60,
        millis
    )
}

/// Parse `H:MM:SS.mmm` (any number of hour digits) or `MM:SS.mmm`.
pub fn parse_timestamp(value: &str) -> Result<f64> {
    let value = value.trim();
    let invalid = || LecternError::SubtitleFormat(format!("Invalid timestamp: {}", value));

    let (clock, fraction) = value.split_once('.').ok_or_else(invalid)?;
    if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let fields = clock
        .split(':')
        .map(|field| {
            if field.is_empty() || !field.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            field.parse::<u64>().map_err(|_| invalid())
        })
        .collect::<Result<Vec<u64>>>()?;

    let (hours, minutes, secs) = match fields.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => (0, *m, *s),
        _ => return Err(invalid()),
    };
    if minutes >= 60 || secs >= 60 {
        return Err(invalid());
    }

    let fraction: f64 = format!("0.{}", fraction).parse().map_err(|_| invalid())?;
    let whole = hours
        .checked_mul(3600)
        .and_then(|total| total.checked_add(minutes * 60 + secs))
        .ok_or_else(invalid)?;

    Ok(whole as f64 + fraction)
}

/// Parse a `start --> end [settings]` timing line.
pub fn parse_timing_line(line: &str) -> Result<(f64, f64)> {
    let (start, rest) = line.split_once(TIMING_ARROW).ok_or_else(|| {
        LecternError::SubtitleFormat(format!("Not a timing line: {}", line))
    })?;
    let end = rest.split_whitespace().next().ok_or_else(|| {
        LecternError::SubtitleFormat(format!("Missing end time: {}", line))
    })?;

    Ok((parse_timestamp(start)?, parse_timestamp(end)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "0:00:00.000");
        assert_eq!(format_timestamp(65.123), "0:01:05.123");
        assert_eq!(format_timestamp(3661.5), "1:01:01.500");
        assert_eq!(format_timestamp(36000.25), "10:00:00.250");
        assert_eq!(format_timestamp(90061.0), "25:01:01.000");
    }

    #[test]
    fn test_format_timestamp_carries_rounded_millis() {
        assert_eq!(format_timestamp(0.9996), "0:00:01.000");
        assert_eq!(format_timestamp(59.9999), "0:01:00.000");
    }

    #[test]
    fn test_timestamp_round_trip_to_millisecond() {
        let mut value = 0.0_f64;
        while value < 20_000.0 {
            let parsed = parse_timestamp(&format_timestamp(value)).unwrap();
            assert!(
                (parsed - value).abs() <= 0.0005 + 1e-9,
                "{} -> {} -> {}",
                value,
                format_timestamp(value),
                parsed
            );
            value += 7.3217;
        }
    }

    #[test]
    fn test_parse_timestamp_forms() {
        assert_eq!(parse_timestamp("01:02:03.500").unwrap(), 3723.5);
        assert_eq!(parse_timestamp("1:02:03.500").unwrap(), 3723.5);
        assert_eq!(parse_timestamp("02:03.250").unwrap(), 123.25);
        assert!(parse_timestamp("1:02:03").is_err());
        assert!(parse_timestamp("1:72:03.000").is_err());
        assert!(parse_timestamp("a:02:03.000").is_err());
    }

    #[test]
    fn test_oversized_hours_are_rejected() {
        assert!(parse_timestamp("99999999999999999:00:00.000").is_err());

        let content = "WEBVTT\n\n99999999999999999:00:00.000 --> 99999999999999999:00:01.000\nhi\n\n";
        assert!(matches!(
            SubtitleDocument::decode(content),
            Err(LecternError::SubtitleFormat(_))
        ));
    }

    #[test]
    fn test_encode_document() {
        let document = SubtitleDocument::from_segments(vec![
            TranscriptSegment::new(0.0, 1.0, "Hola"),
            TranscriptSegment::new(1.0, 2.5, " Mundo "),
        ]);

        assert_eq!(
            document.encode(),
            "WEBVTT\n\n0:00:00.000 --> 0:00:01.000\nHola\n\n0:00:01.000 --> 0:00:02.500\nMundo\n\n"
        );
    }

    #[test]
    fn test_encode_decode_preserves_cues() {
        let segments = vec![
            TranscriptSegment::new(0.0, 1.2, "first"),
            TranscriptSegment::new(1.2, 3.75, "second line"),
            TranscriptSegment::new(3599.9, 3725.125, "over an hour"),
        ];
        let document = SubtitleDocument::from_segments(segments.clone());

        let decoded = SubtitleDocument::decode(&document.encode()).unwrap();
        assert_eq!(decoded.len(), segments.len());
        for (got, want) in decoded.cues.iter().zip(&segments) {
            assert!((got.start - want.start).abs() < 1e-6);
            assert!((got.end - want.end).abs() < 1e-6);
            assert_eq!(got.text, want.text);
        }
    }

    #[test]
    fn test_decode_tolerates_bom_crlf_identifiers_and_notes() {
        let content = "\u{FEFF}WEBVTT - course\r\n\r\nNOTE generated\r\nby hand\r\n\r\n1\r\n00:01.000 --> 00:02.000 align:start\r\nline one\r\nline two\r\n\r\n";
        let document = SubtitleDocument::decode(content).unwrap();

        assert_eq!(document.len(), 1);
        assert_eq!(document.cues[0].start, 1.0);
        assert_eq!(document.cues[0].end, 2.0);
        assert_eq!(document.cues[0].text, "line one line two");
    }

    #[test]
    fn test_decode_requires_header() {
        assert!(SubtitleDocument::decode("").is_err());
        assert!(SubtitleDocument::decode("0:00:00.000 --> 0:00:01.000\nhi\n").is_err());
    }

    #[test]
    fn test_cue_text_line_classification() {
        assert!(is_cue_text_line("Hola"));
        assert!(!is_cue_text_line("WEBVTT"));
        assert!(!is_cue_text_line("0:00:00.000 --> 0:00:01.000"));
        assert!(!is_cue_text_line("   "));
    }
}
