//! HTML table → header-driven course records.
//!
//! One extractor serves both portal pages. A [`TableSpec`] picks how the table
//! is located ([`TableLocator`]) and how rows become records ([`RowLayout`]):
//!
//! - grade history: first `table.gridtable`, header row, one record per row
//! - curriculum plan: the `table.planTable` containing a marker phrase,
//!   rowspan rows dropped, fixed column offsets mapped to names

use std::fmt;

use scraper::{ElementRef, Html};

use crate::domain::{CellValue, Course, RetrievalResult, fields};
use crate::extract::html::{element_text, selector};

/// How to find the target table in the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLocator {
    /// First `<table>` carrying this class.
    ByClass(&'static str),
    /// First `<table>` of this class whose text contains `marker`.
    ByClassWithMarker {
        class: &'static str,
        marker: &'static str,
    },
}

/// A named field read from a fixed cell offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedColumn {
    pub index: usize,
    pub field: &'static str,
}

/// How rows are turned into records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLayout {
    /// Column names come from the `thead` row, or the first row without one.
    /// Rows with fewer cells than headers are skipped.
    HeaderRow,
    /// Column names are fixed; rows with any `rowspan` cell are sub-headers and
    /// are skipped, as are rows shorter than `min_cells`. Offsets past the end
    /// of a row yield empty text.
    FixedColumns {
        columns: &'static [FixedColumn],
        min_cells: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub locator: TableLocator,
    pub layout: RowLayout,
    /// Fields whose purely numeric text is converted to `f64`.
    pub numeric_fields: &'static [&'static str],
}

pub const GRADE_TABLE: TableSpec = TableSpec {
    locator: TableLocator::ByClass("gridtable"),
    layout: RowLayout::HeaderRow,
    numeric_fields: &[
        fields::CREDIT,
        fields::GRADE_POINT,
        fields::USUAL_SCORE,
        fields::MIDTERM_SCORE,
        fields::FINAL_EXAM_SCORE,
        fields::TOTAL_SCORE,
        fields::FINAL_SCORE,
    ],
};

/// Marker phrase ("hour category") only present in the course table of the plan page.
pub const PLAN_MARKER: &str = "学时种类";

pub const PLAN_TABLE: TableSpec = TableSpec {
    locator: TableLocator::ByClassWithMarker {
        class: "planTable",
        marker: PLAN_MARKER,
    },
    layout: RowLayout::FixedColumns {
        columns: &[
            FixedColumn { index: 1, field: fields::COURSE_ID },
            FixedColumn { index: 2, field: fields::COURSE_NAME },
            FixedColumn { index: 3, field: fields::PLAN_HOURS },
            FixedColumn { index: 9, field: fields::PLAN_CREDIT },
            FixedColumn { index: 10, field: fields::PLAN_WEEKLY_HOURS },
            FixedColumn { index: 11, field: fields::PLAN_ASSESSMENT },
            FixedColumn { index: 12, field: fields::PLAN_COURSE_TYPE },
            FixedColumn { index: 13, field: fields::PLAN_COURSE_GROUP },
            FixedColumn { index: 14, field: fields::PLAN_GRADING },
        ],
        min_cells: 12,
    },
    numeric_fields: &[fields::PLAN_HOURS, fields::PLAN_CREDIT, fields::PLAN_WEEKLY_HOURS],
};

/// Why a table could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// No table of the expected class in the page.
    TableNotFound,
    /// Tables of the class exist but none contains the marker phrase.
    MarkerNotFound(&'static str),
    /// The table exists but its structure is unusable.
    Malformed(String),
}

impl ExtractError {
    /// True for the "page not rendered yet" family of failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TableNotFound | Self::MarkerNotFound(_))
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableNotFound => write!(f, "table not found"),
            Self::MarkerNotFound(marker) => write!(f, "marker table not found ('{marker}')"),
            Self::Malformed(msg) => write!(f, "malformed table: {msg}"),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract records from `html` according to `spec`.
///
/// A located table with no data rows is a success with `count == 0`.
pub fn extract(html: &str, spec: &TableSpec) -> Result<RetrievalResult, ExtractError> {
    let doc = Html::parse_document(html);
    let table = locate_table(&doc, spec.locator)?;

    let result = match spec.layout {
        RowLayout::HeaderRow => extract_header_rows(table, spec.numeric_fields)?,
        RowLayout::FixedColumns { columns, min_cells } => {
            extract_fixed_columns(table, columns, min_cells, spec.numeric_fields)?
        }
    };
    tracing::debug!(rows = result.count, columns = result.headers.len(), "table extracted");
    Ok(result)
}

/// Convert cell text for `field`.
///
/// Known numeric fields whose text is ASCII digits with at most one `.` become
/// numbers; everything else stays text. Never fails.
pub fn coerce(field: &str, text: String, numeric_fields: &[&str]) -> CellValue {
    if numeric_fields.contains(&field) && looks_numeric(&text) {
        if let Ok(v) = text.parse::<f64>() {
            return CellValue::Number(v);
        }
    }
    CellValue::Text(text)
}

fn looks_numeric(s: &str) -> bool {
    let mut digits = 0usize;
    let mut dots = 0usize;
    for c in s.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

fn locate_table(doc: &Html, locator: TableLocator) -> Result<ElementRef<'_>, ExtractError> {
    let class = match locator {
        TableLocator::ByClass(class) => class,
        TableLocator::ByClassWithMarker { class, .. } => class,
    };
    let sel = selector(&format!("table.{class}")).map_err(ExtractError::Malformed)?;
    let mut candidates = doc.select(&sel).peekable();
    if candidates.peek().is_none() {
        return Err(ExtractError::TableNotFound);
    }

    match locator {
        TableLocator::ByClass(_) => candidates.next().ok_or(ExtractError::TableNotFound),
        TableLocator::ByClassWithMarker { marker, .. } => candidates
            .find(|t| element_text(*t).contains(marker))
            .ok_or(ExtractError::MarkerNotFound(marker)),
    }
}

fn extract_header_rows(
    table: ElementRef<'_>,
    numeric_fields: &[&str],
) -> Result<RetrievalResult, ExtractError> {
    let thead_row = selector("thead tr").map_err(ExtractError::Malformed)?;
    let body_row = selector("tbody tr").map_err(ExtractError::Malformed)?;
    let any_row = selector("tr").map_err(ExtractError::Malformed)?;

    let (header_row, data_rows): (Option<ElementRef<'_>>, Vec<ElementRef<'_>>) =
        match table.select(&thead_row).next() {
            Some(head) => (Some(head), table.select(&body_row).collect()),
            None => {
                let mut rows = table.select(&any_row);
                (rows.next(), rows.collect())
            }
        };

    let header_row = header_row.ok_or_else(|| ExtractError::Malformed("no header row".into()))?;
    let headers: Vec<String> = row_cells(header_row, &["th", "td"]).map(element_text).collect();
    if headers.is_empty() {
        return Err(ExtractError::Malformed("header row has no cells".into()));
    }

    let mut courses = Vec::new();
    for row in data_rows {
        let cells: Vec<ElementRef<'_>> = row_cells(row, &["th", "td"]).collect();
        if cells.len() < headers.len() {
            continue;
        }
        let mut course = Course::new();
        for (header, cell) in headers.iter().zip(&cells) {
            course.insert(header.clone(), coerce(header, element_text(*cell), numeric_fields));
        }
        courses.push(course);
    }

    Ok(RetrievalResult::new(headers, courses))
}

fn extract_fixed_columns(
    table: ElementRef<'_>,
    columns: &[FixedColumn],
    min_cells: usize,
    numeric_fields: &[&str],
) -> Result<RetrievalResult, ExtractError> {
    let tbody_sel = selector("tbody").map_err(ExtractError::Malformed)?;
    let tbody = table
        .select(&tbody_sel)
        .next()
        .ok_or_else(|| ExtractError::Malformed("table has no tbody".into()))?;

    let mut courses = Vec::new();
    for row in row_children(tbody) {
        let cells: Vec<ElementRef<'_>> = row_cells(row, &["td"]).collect();
        if cells.iter().any(|c| c.value().attr("rowspan").is_some()) {
            continue;
        }
        if cells.len() < min_cells {
            continue;
        }
        let mut course = Course::new();
        for col in columns {
            let text = cells.get(col.index).map(|c| element_text(*c)).unwrap_or_default();
            course.insert(col.field, coerce(col.field, text, numeric_fields));
        }
        courses.push(course);
    }

    let headers = columns.iter().map(|c| c.field.to_string()).collect();
    Ok(RetrievalResult::new(headers, courses))
}

/// Direct `<tr>` children of a table section.
fn row_children<'a>(section: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    section
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "tr")
}

/// Direct cell children of a row with one of the given tag names.
fn row_cells<'a>(
    row: ElementRef<'a>,
    tags: &'a [&'a str],
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(move |el| tags.contains(&el.value().name()))
}
