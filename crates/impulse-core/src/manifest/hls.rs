//! Variant-stream attribute scanning for HLS master playlists
//!
//! Every line is scanned on its own. A line contributes a quality when its
//! attribute list carries both `BANDWIDTH` and `RESOLUTION`; anything else is
//! skipped, so one broken variant never hides the rest of the ladder.

use super::VideoQuality;
use nom::{
    branch::alt,
    bytes::complete::{take_till, take_while, take_while1},
    character::complete::{char, space0},
    combinator::map,
    multi::separated_list0,
    sequence::{delimited, separated_pair},
    IResult, Parser,
};

const BANDWIDTH: &str = "BANDWIDTH";
const RESOLUTION: &str = "RESOLUTION";

/// One `KEY=VALUE` pair of an attribute list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Attribute<'a> {
    name: &'a str,
    value: &'a str,
}

fn attribute_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_').parse(input)
}

fn quoted_value(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_till(|c: char| c == '"'), char('"')).parse(input)
}

fn bare_value(input: &str) -> IResult<&str, &str> {
    take_till(|c: char| c == ',').parse(input)
}

fn attribute(input: &str) -> IResult<&str, Option<Attribute<'_>>> {
    map(
        separated_pair(attribute_name, char('='), alt((quoted_value, bare_value))),
        |(name, value): (&str, &str)| {
            Some(Attribute {
                name,
                value: value.trim(),
            })
        },
    )
    .parse(input)
}

/// Tokens that are not `KEY=VALUE`, empty ones included, are kept as
/// placeholders so the list keeps going. The `,` separator always consumes,
/// so an empty token cannot stall the list.
fn junk(input: &str) -> IResult<&str, Option<Attribute<'_>>> {
    map(take_while(|c: char| c != ','), |_| None).parse(input)
}

fn attribute_list(input: &str) -> IResult<&str, Vec<Option<Attribute<'_>>>> {
    separated_list0(char(','), delimited(space0, alt((attribute, junk)), space0)).parse(input)
}

/// Bandwidth in bits per second
fn parse_bandwidth(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|bandwidth| bandwidth.is_finite() && *bandwidth >= 0.0)
}

/// `1920x1080` becomes `1080p`
fn resolution_label(value: &str) -> Option<String> {
    let (_, height) = value.split_once(|c: char| c == 'x' || c == 'X')?;
    let height: u32 = height.trim().parse().ok()?;
    (height > 0).then(|| format!("{}p", height))
}

fn quality_from_line(line: &str) -> Option<VideoQuality> {
    let line = line.trim();
    let attributes = match line.strip_prefix('#') {
        Some(tagged) => tagged.split_once(':')?.1,
        None => line,
    };

    let (_, parsed) = attribute_list(attributes).ok()?;

    let mut bandwidth = None;
    let mut resolution = None;
    for attribute in parsed.into_iter().flatten() {
        match attribute.name {
            BANDWIDTH if bandwidth.is_none() => bandwidth = Some(attribute.value),
            RESOLUTION if resolution.is_none() => resolution = Some(attribute.value),
            _ => {}
        }
    }

    let bitrate = parse_bandwidth(bandwidth?)?;
    let label = resolution_label(resolution?)?;
    Some(VideoQuality::new(bitrate, label))
}

/// Extract the selectable qualities of a playlist.
///
/// Entries sharing a resolution label collapse to the highest bandwidth, the
/// list is ordered by bandwidth descending (ties keep playlist order), and
/// [`VideoQuality::automatic`] always comes first.
pub fn parse_qualities(manifest: &str) -> Vec<VideoQuality> {
    let mut qualities: Vec<VideoQuality> = Vec::new();

    for line in manifest.lines() {
        let Some(quality) = quality_from_line(line) else {
            continue;
        };

        match qualities
            .iter_mut()
            .find(|existing| existing.resolution == quality.resolution)
        {
            Some(existing) => {
                if quality.bitrate > existing.bitrate {
                    *existing = quality;
                }
            }
            None => qualities.push(quality),
        }
    }

    qualities.sort_by(|a, b| b.bitrate.total_cmp(&a.bitrate));
    qualities.insert(0, VideoQuality::automatic());
    qualities
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_inf(width: u32, height: u32, bandwidth: u64) -> String {
        format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{},CODECS=\"avc1.4d401f,mp4a.40.2\"\n{}p.m3u8\n",
            bandwidth, width, height, height
        )
    }

    fn playlist(variants: &[(u32, u32, u64)]) -> String {
        let mut out = String::from("#EXTM3U\n#EXT-X-VERSION:3\n");
        for (w, h, bw) in variants {
            out.push_str(&stream_inf(*w, *h, *bw));
        }
        out
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_qualities(""), vec![VideoQuality::automatic()]);
    }

    #[test]
    fn test_single_entry() {
        let qualities = parse_qualities(&playlist(&[(1280, 720, 2_000_000)]));
        assert_eq!(
            qualities,
            vec![VideoQuality::automatic(), VideoQuality::new(2_000_000.0, "720p")]
        );
    }

    #[test]
    fn test_duplicate_resolution_keeps_higher_bandwidth() {
        let qualities = parse_qualities(&playlist(&[
            (1920, 1080, 5_000_000),
            (1280, 720, 5_000_000),
            (1280, 720, 2_000_000),
        ]));
        assert_eq!(
            qualities,
            vec![
                VideoQuality::automatic(),
                VideoQuality::new(5_000_000.0, "1080p"),
                VideoQuality::new(5_000_000.0, "720p"),
            ]
        );
    }

    #[test]
    fn test_later_higher_bandwidth_replaces() {
        let qualities = parse_qualities(&playlist(&[(1280, 720, 1_000_000), (1280, 720, 3_000_000)]));
        assert_eq!(
            qualities,
            vec![VideoQuality::automatic(), VideoQuality::new(3_000_000.0, "720p")]
        );
    }

    #[test]
    fn test_sorted_descending() {
        let qualities = parse_qualities(&playlist(&[
            (640, 360, 800_000),
            (1920, 1080, 6_000_000),
            (1280, 720, 3_000_000),
        ]));
        let labels: Vec<&str> = qualities.iter().map(|q| q.resolution.as_str()).collect();
        assert_eq!(labels, vec!["Automatic", "1080p", "720p", "360p"]);
    }

    #[test]
    fn test_non_numeric_bandwidth_skipped() {
        let qualities = parse_qualities("#EXT-X-STREAM-INF:BANDWIDTH=abc,RESOLUTION=1280x720\n");
        assert_eq!(qualities, vec![VideoQuality::automatic()]);
    }

    #[test]
    fn test_resolution_without_separator_skipped() {
        let qualities = parse_qualities("#EXT-X-STREAM-INF:BANDWIDTH=2000000,RESOLUTION=1280\n");
        assert_eq!(qualities, vec![VideoQuality::automatic()]);
    }

    #[test]
    fn test_missing_attribute_skipped() {
        let qualities = parse_qualities(
            "#EXT-X-STREAM-INF:BANDWIDTH=2000000,CODECS=\"mp4a.40.2\"\naudio.m3u8\n",
        );
        assert_eq!(qualities, vec![VideoQuality::automatic()]);
    }

    #[test]
    fn test_average_bandwidth_is_not_bandwidth() {
        let qualities = parse_qualities(
            "#EXT-X-STREAM-INF:AVERAGE-BANDWIDTH=1000,BANDWIDTH=2000,RESOLUTION=640x360\n",
        );
        assert_eq!(
            qualities,
            vec![VideoQuality::automatic(), VideoQuality::new(2000.0, "360p")]
        );
    }

    #[test]
    fn test_quoted_commas_do_not_split_attributes() {
        let qualities = parse_qualities(
            "#EXT-X-STREAM-INF:CODECS=\"avc1.640028,mp4a.40.2\",RESOLUTION=1920x1080,BANDWIDTH=7000000\n",
        );
        assert_eq!(
            qualities,
            vec![VideoQuality::automatic(), VideoQuality::new(7_000_000.0, "1080p")]
        );
    }

    #[test]
    fn test_crlf_and_spacing_tolerated() {
        let qualities =
            parse_qualities("#EXTM3U\r\n#EXT-X-STREAM-INF: BANDWIDTH=900000 , RESOLUTION=854x480\r\n");
        assert_eq!(
            qualities,
            vec![VideoQuality::automatic(), VideoQuality::new(900_000.0, "480p")]
        );
    }

    #[test]
    fn test_empty_tokens_keep_the_variant() {
        let expected = vec![VideoQuality::automatic(), VideoQuality::new(2_000_000.0, "720p")];
        assert_eq!(
            parse_qualities("#EXT-X-STREAM-INF:BANDWIDTH=2000000,,RESOLUTION=1280x720\n"),
            expected
        );
        assert_eq!(
            parse_qualities("#EXT-X-STREAM-INF:PROGRAM-ID=1, ,BANDWIDTH=2000000,RESOLUTION=1280x720\n"),
            expected
        );
        assert_eq!(
            parse_qualities("#EXT-X-STREAM-INF:,BANDWIDTH=2000000,RESOLUTION=1280x720,\n"),
            expected
        );
    }

    #[test]
    fn test_resolution_label() {
        assert_eq!(resolution_label("1920x1080").as_deref(), Some("1080p"));
        assert_eq!(resolution_label("3840X2160").as_deref(), Some("2160p"));
        assert_eq!(resolution_label("1920x"), None);
        assert_eq!(resolution_label("1920xabc"), None);
    }

    #[test]
    fn test_attribute_list_tolerates_junk() {
        let (_, attributes) = attribute_list("FOO,BANDWIDTH=1,BAR=\"x,y\"").unwrap();
        let names: Vec<&str> = attributes.into_iter().flatten().map(|a| a.name).collect();
        assert_eq!(names, vec!["BANDWIDTH", "BAR"]);
    }
}
