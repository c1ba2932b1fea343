//! Readers for the MovingAI benchmark formats: octile `.map` grids and
//! version 1 `.scen` scenario files.

use std::fs;
use std::path::Path;

use crate::benchmark::TestCase;
use crate::error::{MapFormatError, ScenarioError};
use crate::grid_map::{GridMap, GridTile};

pub fn load_map<P: AsRef<Path>>(path: P) -> Result<GridMap, MapFormatError> {
    parse_map(&fs::read_to_string(path)?)
}

pub fn parse_map(text: &str) -> Result<GridMap, MapFormatError> {
    let mut lines = text.lines().enumerate().map(|(idx, line)| (idx + 1, line.trim_end()));

    let (_, map_type) = header(&mut lines, "type")?;
    if map_type != "octile" {
        return Err(MapFormatError::UnsupportedType(map_type.to_string()));
    }
    let (height_line, height) = header(&mut lines, "height")?;
    let height: u32 = parse_dimension(height_line, "height", height)?;
    let (width_line, width) = header(&mut lines, "width")?;
    let width: u32 = parse_dimension(width_line, "width", width)?;
    header(&mut lines, "map")?;

    let mut obstacles = Vec::with_capacity(width as usize * height as usize);
    let mut rows = 0;
    for (_, row) in lines {
        if row.is_empty() && rows == height as usize {
            continue;
        }
        let found = row.chars().count();
        if found != width as usize {
            return Err(MapFormatError::RaggedRow {
                row: rows,
                expected: width as usize,
                found,
            });
        }
        obstacles.extend(row.chars().map(|c| !matches!(c, '.' | 'G' | 'S')));
        rows += 1;
    }
    if rows != height as usize {
        return Err(MapFormatError::RowCount {
            expected: height as usize,
            found: rows,
        });
    }

    GridMap::from_obstacles(width, height, obstacles)
}

fn header<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    expected: &'static str,
) -> Result<(usize, &'a str), MapFormatError> {
    let (line, content) = lines.next().ok_or(MapFormatError::MissingHeader { line: 0, expected })?;
    let mut tokens = content.split_whitespace();
    if tokens.next() != Some(expected) {
        return Err(MapFormatError::MissingHeader { line, expected });
    }
    Ok((line, tokens.next().unwrap_or("")))
}

fn parse_dimension(line: usize, field: &'static str, value: &str) -> Result<u32, MapFormatError> {
    match value.parse::<u32>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(MapFormatError::InvalidDimension {
            line,
            field,
            value: value.to_string(),
        }),
    }
}

pub fn load_test_cases<P: AsRef<Path>>(path: P) -> Result<Vec<TestCase>, ScenarioError> {
    parse_test_cases(&fs::read_to_string(path)?)
}

/// Each scenario line reads `bucket map width height sx sy gx gy optimal`;
/// the bucket becomes the grouping id.
pub fn parse_test_cases(text: &str) -> Result<Vec<TestCase>, ScenarioError> {
    let mut lines = text.lines().enumerate();
    let version = lines.next().map(|(_, l)| l.trim()).unwrap_or("");
    let mut tokens = version.split_whitespace();
    if tokens.next() != Some("version") || !matches!(tokens.next(), Some("1" | "1.0")) {
        return Err(ScenarioError::UnsupportedVersion(version.to_string()));
    }

    let mut cases = vec![];
    for (idx, line) in lines {
        let line_no = idx + 1;
        let mut tokens = line.split_whitespace();
        let Some(bucket) = tokens.next() else {
            continue;
        };

        let mut next_field = |field: &'static str| {
            tokens.next().ok_or(ScenarioError::MissingField { line: line_no, field })
        };
        let number = |field: &'static str, value: &str| {
            value.parse::<u32>().map_err(|_| ScenarioError::InvalidField {
                line: line_no,
                field,
                value: value.to_string(),
            })
        };

        let grouping_id = number("bucket", bucket)?;
        next_field("map")?;
        next_field("map width")?;
        next_field("map height")?;
        let start_x = number("start x", next_field("start x")?)?;
        let start_y = number("start y", next_field("start y")?)?;
        let goal_x = number("goal x", next_field("goal x")?)?;
        let goal_y = number("goal y", next_field("goal y")?)?;

        cases.push(TestCase {
            start: GridTile::new(start_x, start_y),
            goal: GridTile::new(goal_x, goal_y),
            grouping_id,
        });
    }
    Ok(cases)
}
