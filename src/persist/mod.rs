//! Text persistence for LTrees, distributions and shards
//!
//! Formats (one record per line):
//! - LTree: one segment per line, entries `value^T` separated by a space,
//!   `T` one of `L`, `N`, `C`
//! - Distribution: segment counts per worker separated by a space, then the
//!   index as `offset^len` pairs separated by `;`
//! - Shard: the two distribution lines followed by the worker's content line
//!
//! Values go through `Display` on the way out and `FromStr` on the way in, so
//! they must not contain spaces.

use std::fmt::Display;
use std::io::{BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;

use crate::{
    coordinator::Shard,
    distribution::{Distribution, SegmentSpan},
    segment::{LTree, Tag, TaggedValue},
    Result, SkeletonError,
};

const ENTRY_SEPARATOR: char = ' ';
const SPAN_SEPARATOR: char = ';';
const TAG_MARK: char = '^';

/// Write one segment per line.
pub fn write_ltree<V: Display>(ltree: &LTree<V>, mut writer: impl Write) -> Result<()> {
    for segment in ltree.segments() {
        write_entries(segment, &mut writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read an LTree, checking every segment's arity.
pub fn read_ltree<V>(reader: impl BufRead) -> Result<LTree<V>>
where
    V: FromStr,
    V::Err: Display,
{
    let mut segments = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        segments.push(parse_entries(&line, number + 1)?);
    }
    LTree::from_segments(segments)
}

/// Write the counts line and the index line.
pub fn write_distribution(distribution: &Distribution, mut writer: impl Write) -> Result<()> {
    write_distribution_lines(distribution, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Read a distribution written by [`write_distribution`].
pub fn read_distribution(reader: impl BufRead) -> Result<Distribution> {
    let mut lines = reader.lines();
    read_distribution_lines(&mut lines)
}

/// Write a shard: distribution lines plus the owned content.
pub fn write_shard<V: Display>(shard: &Shard<V>, mut writer: impl Write) -> Result<()> {
    write_distribution_lines(shard.distribution(), &mut writer)?;
    write_entries(shard.content(), &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Read the shard of `rank`.
pub fn read_shard<V>(reader: impl BufRead, rank: usize) -> Result<Shard<V>>
where
    V: FromStr,
    V::Err: Display,
{
    let mut lines = reader.lines();
    let distribution = read_distribution_lines(&mut lines)?;
    let content = match lines.next().transpose()? {
        Some(line) => parse_entries(&line, 3)?,
        None => Vec::new(),
    };
    Shard::new(Arc::new(distribution), rank, content)
}

fn write_entries<V: Display>(entries: &[TaggedValue<V>], writer: &mut impl Write) -> Result<()> {
    for (position, entry) in entries.iter().enumerate() {
        if position > 0 {
            write!(writer, "{ENTRY_SEPARATOR}")?;
        }
        write!(writer, "{entry}")?;
    }
    writeln!(writer)?;
    Ok(())
}

fn parse_entries<V>(line: &str, number: usize) -> Result<Vec<TaggedValue<V>>>
where
    V: FromStr,
    V::Err: Display,
{
    line.split(ENTRY_SEPARATOR)
        .filter(|field| !field.is_empty())
        .map(|field| parse_entry(field, number))
        .collect()
}

fn parse_entry<V>(field: &str, number: usize) -> Result<TaggedValue<V>>
where
    V: FromStr,
    V::Err: Display,
{
    let (value, letter) = field
        .rsplit_once(TAG_MARK)
        .ok_or_else(|| parse_error(number, format!("entry `{field}` has no tag")))?;
    let mut letters = letter.chars();
    let tag = match (letters.next(), letters.next()) {
        (Some(letter), None) => Tag::from_letter(letter),
        _ => None,
    }
    .ok_or_else(|| parse_error(number, format!("unknown tag `{letter}`")))?;
    let value = value
        .parse::<V>()
        .map_err(|err| parse_error(number, format!("bad value `{value}`: {err}")))?;
    Ok(TaggedValue::new(value, tag))
}

fn write_distribution_lines(distribution: &Distribution, writer: &mut impl Write) -> Result<()> {
    let counts: Vec<String> = distribution.counts().iter().map(usize::to_string).collect();
    writeln!(writer, "{}", counts.join(&ENTRY_SEPARATOR.to_string()))?;
    let spans: Vec<String> = distribution
        .index()
        .iter()
        .map(|span| format!("{}{TAG_MARK}{}", span.offset, span.len))
        .collect();
    writeln!(writer, "{}", spans.join(&SPAN_SEPARATOR.to_string()))?;
    Ok(())
}

fn read_distribution_lines(
    lines: &mut impl Iterator<Item = std::io::Result<String>>,
) -> Result<Distribution> {
    let counts_line = lines
        .next()
        .transpose()?
        .ok_or_else(|| parse_error(1, "missing counts line".to_string()))?;
    let counts = counts_line
        .split(ENTRY_SEPARATOR)
        .filter(|field| !field.is_empty())
        .map(|field| parse_number(field, 1))
        .collect::<Result<Vec<usize>>>()?;

    let index_line = lines
        .next()
        .transpose()?
        .ok_or_else(|| parse_error(2, "missing index line".to_string()))?;
    let index = index_line
        .split(SPAN_SEPARATOR)
        .filter(|field| !field.is_empty())
        .map(|field| {
            let (offset, len) = field
                .split_once(TAG_MARK)
                .ok_or_else(|| parse_error(2, format!("span `{field}` is not offset^len")))?;
            Ok(SegmentSpan {
                offset: parse_number(offset, 2)?,
                len: parse_number(len, 2)?,
            })
        })
        .collect::<Result<Vec<SegmentSpan>>>()?;

    Distribution::from_parts(counts, index)
}

fn parse_number(field: &str, number: usize) -> Result<usize> {
    field
        .trim()
        .parse()
        .map_err(|err| parse_error(number, format!("bad number `{field}`: {err}")))
}

fn parse_error(line: usize, reason: String) -> SkeletonError {
    SkeletonError::Parse { line, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;

    fn sample() -> LTree<i32> {
        Tree::node(
            1,
            Tree::node(2, Tree::leaf(3), Tree::leaf(4)),
            Tree::leaf(5),
        )
        .linearize(2)
        .unwrap()
    }

    #[test]
    fn test_ltree_text_layout() {
        let mut out = Vec::new();
        write_ltree(&sample(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1^C\n2^C\n3^L\n4^L\n5^L\n");
    }

    #[test]
    fn test_read_ltree_spliced_segment() {
        let text = "1^N 2^C 7^L\n3^L\n4^L\n";
        let ltree: LTree<i32> = read_ltree(text.as_bytes()).unwrap();
        assert_eq!(ltree.segment_sizes(), vec![3, 1, 1]);
        assert_eq!(ltree.segments()[0][1], TaggedValue::critical(2));
    }

    #[test]
    fn test_read_ltree_reports_line() {
        let text = "1^C\n2^X\n";
        let err = read_ltree::<i32>(text.as_bytes()).unwrap_err();
        assert!(matches!(err, SkeletonError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_read_ltree_rejects_bad_arity() {
        let text = "1^N 2^L\n";
        assert!(matches!(
            read_ltree::<i32>(text.as_bytes()),
            Err(SkeletonError::IllFormed { .. })
        ));
    }

    #[test]
    fn test_distribution_text_layout() {
        let distribution = Distribution::for_segments(&[5, 3, 3, 5, 5, 1, 1, 3], 3).unwrap();
        let mut out = Vec::new();
        write_distribution(&distribution, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "2 2 4\n0^5;5^3;0^3;3^5;0^5;5^1;6^1;7^3\n");
        assert_eq!(read_distribution(text.as_bytes()).unwrap(), distribution);
    }

    #[test]
    fn test_shard_with_no_segments() {
        let distribution = Arc::new(Distribution::for_segments(&[1], 2).unwrap());
        let shard: Shard<i32> = Shard::new(distribution, 1, Vec::new()).unwrap();
        let mut out = Vec::new();
        write_shard(&shard, &mut out).unwrap();
        let back: Shard<i32> = read_shard(out.as_slice(), 1).unwrap();
        assert_eq!(back, shard);
    }
}
