//! Parsers for the survey CSV files.
//!
//! Handles four files:
//! - processed menu details: `메뉴,간편성,분류,<category>_<value>,...` with 0/1 cells
//! - raw menu details: the same metadata plus multi-valued text fields
//!   (`주재료`, `맛 프로파일`, ...) that still need one-hot expansion
//! - user preferences: `이름,<menu>,<menu>,...` with scores or survey labels
//! - correlation matrix: square table with menu names on both axes
//!
//! Every `parse_*` function has a `*_from_str` twin working on in-memory
//! content; the path versions only add file reading.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

const MENU_COLUMNS: &[&str] = &["메뉴", "menu"];
const CATEGORY_COLUMNS: &[&str] = &["분류", "음식종류", "category"];
const SIMPLICITY_COLUMNS: &[&str] = &["간편성", "simplicity"];
const NAME_COLUMNS: &[&str] = &["이름", "name"];
const TIMESTAMP_COLUMNS: &[&str] = &["타임스탬프", "timestamp"];

/// Read a UTF-8 file into lines, dropping a leading byte-order mark
fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })?;
    Ok(content_lines(&content))
}

fn content_lines(content: &str) -> Vec<String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    content.lines().map(|s| s.to_string()).collect()
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Split one CSV record, honouring double quotes and `""` escapes
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Quote a field for output if it contains a delimiter or quote
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Position of the first header cell matching one of `names`
fn find_column(header: &[String], names: &[&str]) -> Option<usize> {
    header
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

fn require_column(header: &[String], names: &[&str], file: &str) -> Result<usize> {
    find_column(header, names).ok_or_else(|| DataLoadError::MissingColumn {
        file: file.to_string(),
        column: names[0].to_string(),
    })
}

/// Split the content into a trimmed header and numbered, non-empty data rows
fn header_and_rows(lines: &[String], file: &str) -> Result<(Vec<String>, Vec<(usize, Vec<String>)>)> {
    let mut iter = lines.iter().enumerate();
    let header = loop {
        match iter.next() {
            Some((_, line)) if line.trim().is_empty() => continue,
            Some((_, line)) => break split_csv_line(line),
            None => {
                return Err(DataLoadError::ParseError {
                    file: file.to_string(),
                    line: 1,
                    reason: "Missing header".to_string(),
                });
            }
        }
    };
    let header = header.into_iter().map(|h| h.trim().to_string()).collect();

    let rows = iter
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| (idx + 1, split_csv_line(line)))
        .collect();
    Ok((header, rows))
}

fn cell<'a>(row: &'a [String], idx: usize) -> &'a str {
    row.get(idx).map(|s| s.trim()).unwrap_or("")
}

/// Map a survey answer to a score
///
/// Example: "1. 환장함" -> 4, "4. 싫어함" -> 1
pub fn parse_survey_label(s: &str) -> Option<u8> {
    match s.trim() {
        "1. 환장함" | "환장함" => Some(4),
        "2. 좋아함" | "좋아함" => Some(3),
        "3. 그럭저럭" | "그럭저럭" => Some(2),
        "4. 싫어함" | "싫어함" => Some(1),
        _ => None,
    }
}

/// Parse a preference cell: empty, a survey label, or an integer
///
/// Integers are returned unchecked so the caller can report the range error
/// with user and menu context.
fn parse_score_cell(s: &str) -> std::result::Result<Option<i64>, String> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    if let Some(score) = parse_survey_label(s) {
        return Ok(Some(score as i64));
    }
    if let Ok(v) = s.parse::<i64>() {
        return Ok(Some(v));
    }
    // processed files written by spreadsheet tools sometimes carry "4.0"
    match s.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 => Ok(Some(f as i64)),
        _ => Err(format!("Invalid score '{}'", s)),
    }
}

/// Normalize a raw survey header into a menu name
///
/// Example: "1. 사케동 (연어덮밥)" -> "사케동"
pub fn normalize_survey_header(header: &str) -> String {
    let without_numbering: String = header
        .chars()
        .filter(|c| !(c.is_ascii_digit() || *c == '.'))
        .collect();
    without_numbering
        .split('(')
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

fn parse_simplicity(s: &str) -> Result<bool> {
    match s.trim().to_lowercase().as_str() {
        "" | "0" | "false" | "no" | "n" | "x" => Ok(false),
        "1" | "true" | "yes" | "y" | "o" => Ok(true),
        other => Err(DataLoadError::InvalidValue {
            field: "simplicity".to_string(),
            value: other.to_string(),
        }),
    }
}

fn parse_indicator(s: &str, file: &str, line: usize, column: &str) -> Result<u8> {
    match s.trim() {
        "1" | "1.0" => Ok(1),
        "0" | "0.0" | "" => Ok(0),
        other => Err(DataLoadError::ParseError {
            file: file.to_string(),
            line,
            reason: format!("Column '{}' must be 0 or 1, found '{}'", column, other),
        }),
    }
}

// =============================================================================
// Menu details
// =============================================================================

/// Parse a processed (already one-hot) menu details file
pub fn parse_menu_table(path: &Path) -> Result<MenuTable> {
    let lines = read_lines(path)?;
    parse_menu_lines(&lines, &file_label(path))
}

pub fn parse_menu_table_from_str(content: &str) -> Result<MenuTable> {
    parse_menu_lines(&content_lines(content), "menu_details")
}

fn parse_menu_lines(lines: &[String], file: &str) -> Result<MenuTable> {
    let (header, rows) = header_and_rows(lines, file)?;
    let menu_col = require_column(&header, MENU_COLUMNS, file)?;
    let category_col = require_column(&header, CATEGORY_COLUMNS, file)?;
    let simple_col = find_column(&header, SIMPLICITY_COLUMNS);

    let attribute_cols: Vec<usize> = (0..header.len())
        .filter(|&i| i != menu_col && i != category_col && Some(i) != simple_col)
        .collect();
    let schema = AttributeSchema::from_names(attribute_cols.iter().map(|&i| &header[i]))?;
    debug!(
        "{}: {} attribute columns in {} categories",
        file,
        schema.len(),
        schema.groups().len()
    );

    let mut table = MenuTable::new(schema);
    for (line_no, row) in rows {
        let name = cell(&row, menu_col);
        if name.is_empty() {
            return Err(DataLoadError::ParseError {
                file: file.to_string(),
                line: line_no,
                reason: "Missing menu name".to_string(),
            });
        }
        let attributes = attribute_cols
            .iter()
            .map(|&i| parse_indicator(cell(&row, i), file, line_no, &header[i]))
            .collect::<Result<Vec<u8>>>()?;
        table.insert_menu(Menu {
            name: name.to_string(),
            category: cell(&row, category_col).to_string(),
            simple: match simple_col {
                Some(i) => parse_simplicity(cell(&row, i))?,
                None => false,
            },
            attributes,
        })?;
    }
    Ok(table)
}

/// A menu row from the raw details file, before one-hot expansion
#[derive(Debug, Clone, PartialEq)]
pub struct RawMenuDetail {
    pub name: String,
    pub category: String,
    pub simple: bool,
    /// Free-text field per attribute category, e.g. "돼지고기+김치"
    pub fields: BTreeMap<AttributeCategory, String>,
}

/// Parse the raw menu details file with multi-valued text fields
pub fn parse_raw_menu_details(path: &Path) -> Result<Vec<RawMenuDetail>> {
    let lines = read_lines(path)?;
    parse_raw_lines(&lines, &file_label(path))
}

pub fn parse_raw_menu_details_from_str(content: &str) -> Result<Vec<RawMenuDetail>> {
    parse_raw_lines(&content_lines(content), "raw_menu_details")
}

fn parse_raw_lines(lines: &[String], file: &str) -> Result<Vec<RawMenuDetail>> {
    let (header, rows) = header_and_rows(lines, file)?;
    let menu_col = require_column(&header, MENU_COLUMNS, file)?;
    let category_col = require_column(&header, CATEGORY_COLUMNS, file)?;
    let simple_col = find_column(&header, SIMPLICITY_COLUMNS);

    // Other columns (difficulty etc.) are not part of the taxonomy and are ignored
    let field_cols: Vec<(usize, AttributeCategory)> = header
        .iter()
        .enumerate()
        .filter_map(|(i, h)| AttributeCategory::from_prefix(h).map(|c| (i, c)))
        .collect();
    if field_cols.is_empty() {
        return Err(DataLoadError::MissingColumn {
            file: file.to_string(),
            column: AttributeCategory::MainIngredient.raw_field().to_string(),
        });
    }

    let mut details = Vec::with_capacity(rows.len());
    for (line_no, row) in rows {
        let name = cell(&row, menu_col);
        if name.is_empty() {
            return Err(DataLoadError::ParseError {
                file: file.to_string(),
                line: line_no,
                reason: "Missing menu name".to_string(),
            });
        }
        let fields = field_cols
            .iter()
            .map(|&(i, category)| (category, cell(&row, i).to_string()))
            .collect();
        details.push(RawMenuDetail {
            name: name.to_string(),
            category: cell(&row, category_col).to_string(),
            simple: match simple_col {
                Some(i) => parse_simplicity(cell(&row, i))?,
                None => false,
            },
            fields,
        });
    }
    Ok(details)
}

/// Split a multi-valued text field into its distinct tokens
///
/// Example: "돼지고기+김치 (묵은지)" -> ["김치", "돼지고기", "묵은지"]
pub fn split_features(field: &str) -> Vec<String> {
    let mut tokens: Vec<String> = field
        .split(['+', '/', '(', ')', ','])
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("unknown"))
        .map(str::to_string)
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens
}

// =============================================================================
// Preferences
// =============================================================================

/// Parse the user preference (survey) file
pub fn parse_preference_table(path: &Path) -> Result<PreferenceTable> {
    let lines = read_lines(path)?;
    parse_preference_lines(&lines, &file_label(path))
}

pub fn parse_preference_table_from_str(content: &str) -> Result<PreferenceTable> {
    parse_preference_lines(&content_lines(content), "user_data")
}

fn parse_preference_lines(lines: &[String], file: &str) -> Result<PreferenceTable> {
    let (header, rows) = header_and_rows(lines, file)?;
    let name_col = require_column(&header, NAME_COLUMNS, file)?;
    let timestamp_col = find_column(&header, TIMESTAMP_COLUMNS);

    let menu_cols: Vec<usize> = (0..header.len())
        .filter(|&i| i != name_col && Some(i) != timestamp_col)
        .collect();
    let menus: Vec<String> = menu_cols
        .iter()
        .map(|&i| normalize_survey_header(&header[i]))
        .collect();
    if let Some(i) = menus.iter().position(|m| m.is_empty()) {
        return Err(DataLoadError::InvalidValue {
            field: "menu column".to_string(),
            value: header[menu_cols[i]].clone(),
        });
    }

    let mut table = PreferenceTable::new(menus)?;
    for (line_no, row) in rows {
        let name = cell(&row, name_col);
        if name.is_empty() {
            debug!("{}: skipping line {} without a name", file, line_no);
            continue;
        }
        let mut scores = Vec::with_capacity(menu_cols.len());
        for (&col, menu) in menu_cols.iter().zip(table.menus()) {
            let parsed = parse_score_cell(cell(&row, col)).map_err(|reason| {
                DataLoadError::ParseError {
                    file: file.to_string(),
                    line: line_no,
                    reason,
                }
            })?;
            let score = match parsed {
                None => None,
                Some(v) if (MIN_SCORE as i64..=MAX_SCORE as i64).contains(&v) => Some(v as u8),
                Some(v) => {
                    return Err(DataLoadError::ScoreOutOfRange {
                        user: name.to_string(),
                        menu: menu.clone(),
                        score: v,
                    });
                }
            };
            scores.push(score);
        }
        table.insert_user(name, scores)?;
    }
    Ok(table)
}

// =============================================================================
// Correlation matrix
// =============================================================================

/// Parse a square correlation matrix file
pub fn parse_correlation_matrix(path: &Path) -> Result<CorrelationMatrix> {
    let lines = read_lines(path)?;
    parse_matrix_lines(&lines, &file_label(path))
}

pub fn parse_correlation_matrix_from_str(content: &str) -> Result<CorrelationMatrix> {
    parse_matrix_lines(&content_lines(content), "menu_correlation_matrix")
}

fn parse_matrix_lines(lines: &[String], file: &str) -> Result<CorrelationMatrix> {
    let (header, rows) = header_and_rows(lines, file)?;
    let menus: Vec<String> = header.iter().skip(1).cloned().collect();
    if rows.len() != menus.len() {
        return Err(DataLoadError::MatrixShape(format!(
            "{} columns but {} rows",
            menus.len(),
            rows.len()
        )));
    }

    let mut values = Vec::with_capacity(menus.len() * menus.len());
    for (i, (line_no, row)) in rows.iter().enumerate() {
        let label = cell(row, 0);
        if label != menus[i] {
            return Err(DataLoadError::MatrixShape(format!(
                "row {} is labelled '{}' but column {} is '{}'",
                i + 1,
                label,
                i + 1,
                menus[i]
            )));
        }
        for j in 0..menus.len() {
            let raw = cell(row, j + 1);
            let value = if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
                f64::NAN
            } else {
                raw.parse::<f64>().map_err(|e| DataLoadError::ParseError {
                    file: file.to_string(),
                    line: *line_no,
                    reason: format!("Invalid similarity '{}': {}", raw, e),
                })?
            };
            values.push(value);
        }
    }
    CorrelationMatrix::from_parts(menus, values)
}

/// Render a correlation matrix in the same layout the parser reads
pub fn correlation_matrix_to_csv(matrix: &CorrelationMatrix) -> String {
    let mut out = String::new();
    let header: Vec<String> = matrix.menus().iter().map(|m| csv_field(m)).collect();
    out.push(',');
    out.push_str(&header.join(","));
    out.push('\n');
    for (i, menu) in matrix.menus().iter().enumerate() {
        out.push_str(&csv_field(menu));
        for value in matrix.row(i) {
            out.push(',');
            if !value.is_nan() {
                out.push_str(&value.to_string());
            }
        }
        out.push('\n');
    }
    out
}

/// Write a correlation matrix file
pub fn write_correlation_matrix(matrix: &CorrelationMatrix, path: &Path) -> Result<()> {
    fs::write(path, correlation_matrix_to_csv(matrix))?;
    debug!("Wrote {}x{} matrix to {:?}", matrix.len(), matrix.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_csv_line_quotes() {
        assert_eq!(split_csv_line("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(
            split_csv_line("김치찌개,\"돼지고기, 김치\",1"),
            vec!["김치찌개", "돼지고기, 김치", "1"]
        );
        assert_eq!(split_csv_line("\"say \"\"hi\"\"\",x"), vec!["say \"hi\"", "x"]);
        assert_eq!(split_csv_line("a,,"), vec!["a", "", ""]);
    }

    #[test]
    fn test_parse_survey_label() {
        assert_eq!(parse_survey_label("1. 환장함"), Some(4));
        assert_eq!(parse_survey_label("2. 좋아함"), Some(3));
        assert_eq!(parse_survey_label("3. 그럭저럭"), Some(2));
        assert_eq!(parse_survey_label("4. 싫어함"), Some(1));
        assert_eq!(parse_survey_label("5. 몰라요"), None);
    }

    #[test]
    fn test_normalize_survey_header() {
        assert_eq!(normalize_survey_header("1. 김치찌개"), "김치찌개");
        assert_eq!(normalize_survey_header("12. 사케동 (연어덮밥)"), "사케동");
        assert_eq!(normalize_survey_header("떡볶이"), "떡볶이");
    }

    #[test]
    fn test_split_features() {
        assert_eq!(
            split_features("돼지고기+김치 (묵은지)"),
            vec!["김치", "돼지고기", "묵은지"]
        );
        assert_eq!(split_features("매운맛/짠맛, 매운맛"), vec!["매운맛", "짠맛"]);
        assert!(split_features("Unknown").is_empty());
        assert!(split_features("").is_empty());
    }

    #[test]
    fn test_parse_menu_table() {
        let content = "\u{feff}메뉴,간편성,분류,주재료_돼지고기,맛 프로파일_매운맛,계절/날씨_겨울\n\
                       김치찌개,0,한식,1,1,1\n\
                       떡볶이,1,분식,0,1,0\n";
        let table = parse_menu_table_from_str(content).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.schema().len(), 3);
        let stew = table.get_menu("김치찌개").unwrap();
        assert_eq!(stew.category, "한식");
        assert!(!stew.simple);
        assert_eq!(stew.attributes, vec![1, 1, 1]);
        assert!(table.get_menu("떡볶이").unwrap().simple);
        assert_eq!(
            table.schema().groups()[&AttributeCategory::FlavorProfile],
            vec!["맛 프로파일_매운맛"]
        );
    }

    #[test]
    fn test_parse_menu_table_missing_category_column() {
        let content = "메뉴,주재료_돼지고기\n김치찌개,1\n";
        let err = parse_menu_table_from_str(content).unwrap_err();
        assert!(matches!(err, DataLoadError::MissingColumn { .. }));
    }

    #[test]
    fn test_parse_menu_table_duplicate_menu() {
        let content = "메뉴,분류,주재료_돼지고기\n김치찌개,한식,1\n김치찌개,한식,0\n";
        let err = parse_menu_table_from_str(content).unwrap_err();
        assert!(matches!(err, DataLoadError::DuplicateMenu { .. }));
    }

    #[test]
    fn test_parse_menu_table_unknown_attribute_prefix() {
        let content = "메뉴,분류,난이도_쉬움\n김치찌개,한식,1\n";
        let err = parse_menu_table_from_str(content).unwrap_err();
        assert!(matches!(err, DataLoadError::UnknownAttributeCategory { .. }));
    }

    #[test]
    fn test_parse_menu_table_non_binary_cell() {
        let content = "메뉴,분류,주재료_돼지고기\n김치찌개,한식,2\n";
        let err = parse_menu_table_from_str(content).unwrap_err();
        assert!(matches!(err, DataLoadError::ParseError { line: 2, .. }));
    }

    #[test]
    fn test_parse_preference_table_labels_and_numbers() {
        let content = "타임스탬프,이름,1. 김치찌개,2. 사케동 (연어덮밥),떡볶이\n\
                       2024/01/01,연누,1. 환장함,3,\n\
                       2024/01/02,,4,4,4\n\
                       2024/01/03,철수,4. 싫어함,2.0,2\n";
        let table = parse_preference_table_from_str(content).unwrap();

        assert_eq!(table.menus(), ["김치찌개", "사케동", "떡볶이"]);
        assert_eq!(table.users().len(), 2);
        assert_eq!(table.score("연누", "김치찌개"), Some(4));
        assert_eq!(table.score("연누", "사케동"), Some(3));
        assert_eq!(table.score("연누", "떡볶이"), None);
        assert_eq!(table.score("철수", "사케동"), Some(2));
    }

    #[test]
    fn test_parse_preference_table_out_of_range() {
        let content = "이름,김치찌개\n연누,5\n";
        let err = parse_preference_table_from_str(content).unwrap_err();
        assert!(matches!(err, DataLoadError::ScoreOutOfRange { score: 5, .. }));
    }

    #[test]
    fn test_parse_preference_table_requires_name_column() {
        let content = "사용자,김치찌개\n연누,4\n";
        let err = parse_preference_table_from_str(content).unwrap_err();
        assert!(matches!(err, DataLoadError::MissingColumn { .. }));
    }

    #[test]
    fn test_parse_preference_table_duplicate_user() {
        let content = "이름,김치찌개\n연누,4\n연누,3\n";
        let err = parse_preference_table_from_str(content).unwrap_err();
        assert!(matches!(err, DataLoadError::DuplicateUser { .. }));
    }

    #[test]
    fn test_parse_raw_menu_details() {
        let content = "메뉴,간편성,분류,주재료,맛 프로파일,난이도\n\
                       김치찌개,0,한식,\"돼지고기+김치\",매운맛,보통\n";
        let details = parse_raw_menu_details_from_str(content).unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(
            details[0].fields[&AttributeCategory::MainIngredient],
            "돼지고기+김치"
        );
        assert_eq!(details[0].fields.len(), 2);
    }

    #[test]
    fn test_correlation_matrix_csv_layout() {
        let matrix = CorrelationMatrix::from_parts(
            vec!["김치찌개".to_string(), "떡볶이".to_string()],
            vec![1.0, 0.5, 0.5, 1.0],
        )
        .unwrap();
        let csv = correlation_matrix_to_csv(&matrix);
        assert!(csv.starts_with(",김치찌개,떡볶이\n"));

        let parsed = parse_correlation_matrix_from_str(&csv).unwrap();
        assert_eq!(parsed.get_by_name("김치찌개", "떡볶이"), Some(0.5));
    }

    #[test]
    fn test_parse_correlation_matrix_nan_cells() {
        let content = ",A,B\nA,1.0,NaN\nB,,1.0\n";
        let matrix = parse_correlation_matrix_from_str(content).unwrap();
        assert_eq!(matrix.get(0, 1), None);
        assert_eq!(matrix.get(1, 0), None);
        assert_eq!(matrix.get(1, 1), Some(1.0));
    }

    #[test]
    fn test_parse_correlation_matrix_label_mismatch() {
        let content = ",A,B\nB,1.0,0.2\nA,0.2,1.0\n";
        let err = parse_correlation_matrix_from_str(content).unwrap_err();
        assert!(matches!(err, DataLoadError::MatrixShape(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = parse_menu_table(Path::new("definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, DataLoadError::FileNotFound { .. }));
    }
}
