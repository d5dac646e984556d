use crate::error::{Result, ScrubError};
use crate::table::{Column, Table, Value};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::{debug, info};
use zip::ZipArchive;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Which sheet of the workbook to load.
#[derive(Debug, Clone)]
pub enum SheetSelector {
    /// Zero-based position in the workbook's sheet list.
    Index(usize),
    /// Sheet tab name, compared exactly.
    Name(String),
}

/// Reads one worksheet of an XLSX workbook into a [`Table`].
///
/// The first sheet row supplies the column headers; every following row is
/// data. Rows are padded with missing cells to the widest row seen, so the
/// table invariant holds even for sparse sheets. A sheet with no rows at all
/// yields an empty table.
pub fn load_sheet(path: &Path, selector: &SheetSelector) -> Result<Table> {
    let file = File::open(path).map_err(|e| ScrubError::file_access(path, e))?;
    let mut archive = ZipArchive::new(file)?;

    let workbook_xml = read_part(&mut archive, WORKBOOK_PART)?
        .ok_or_else(|| ScrubError::Format(format!("missing {WORKBOOK_PART}")))?;
    let sheets = parse_workbook_sheets(&workbook_xml)?;

    let rels_xml = read_part(&mut archive, WORKBOOK_RELS_PART)?
        .ok_or_else(|| ScrubError::Format(format!("missing {WORKBOOK_RELS_PART}")))?;
    let rels = parse_relationships(&rels_xml)?;

    let entry = match selector {
        SheetSelector::Index(i) => sheets.get(*i).ok_or_else(|| {
            ScrubError::Format(format!(
                "sheet index {i} out of range, workbook has {} sheet(s)",
                sheets.len()
            ))
        })?,
        SheetSelector::Name(name) => sheets
            .iter()
            .find(|s| s.name == *name)
            .ok_or_else(|| ScrubError::Format(format!("no sheet named '{name}'")))?,
    };

    let target = rels.get(&entry.rel_id).ok_or_else(|| {
        ScrubError::Format(format!(
            "sheet '{}' has no relationship target for {}",
            entry.name, entry.rel_id
        ))
    })?;
    let sheet_part = resolve_target(target);

    let shared_strings = match read_part(&mut archive, SHARED_STRINGS_PART)? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let sheet_xml = read_part(&mut archive, &sheet_part)?
        .ok_or_else(|| ScrubError::Format(format!("missing worksheet part {sheet_part}")))?;
    let rows = parse_worksheet(&sheet_xml, &shared_strings)?;
    debug!("Parsed {} raw rows from sheet '{}'", rows.len(), entry.name);

    let table = table_from_rows(rows)?;
    info!(
        "Data loaded: {} rows, {} columns",
        table.row_count(),
        table.column_count()
    );
    println!(
        "Data loaded: {} rows, {} columns",
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

struct SheetEntry {
    name: String,
    rel_id: String,
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    match archive.by_name(name) {
        Ok(mut part) => {
            let mut xml = String::new();
            part.read_to_string(&mut xml)?;
            Ok(Some(xml))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Sheet targets in workbook rels are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

fn parse_workbook_sheets(xml: &str) -> Result<Vec<SheetEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut rel_id = None;
                for attr in e.attributes().with_checks(false) {
                    let attr = attr?;
                    if attr.key.as_ref() == b"name" {
                        name = Some(attr.unescape_value()?.into_owned());
                    } else if attr.key.local_name().as_ref() == b"id" {
                        rel_id = Some(attr.unescape_value()?.into_owned());
                    }
                }
                match (name, rel_id) {
                    (Some(name), Some(rel_id)) => sheets.push(SheetEntry { name, rel_id }),
                    _ => {
                        return Err(ScrubError::Format(
                            "workbook sheet entry missing name or relationship id".into(),
                        ))
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut rels = HashMap::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = attr_value(&e, b"Id")?;
                let target = attr_value(&e, b"Target")?;
                if let (Some(id), Some(target)) = (id, target) {
                    rels.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

/// Flattens each `<si>` entry to its visible text, concatenating rich-text
/// runs and skipping phonetic annotations.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut items = Vec::new();
    let mut current: Option<String> = None;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"si" => {
                current = Some(String::new());
            }
            Event::Start(e) if e.local_name().as_ref() == b"rPh" => {
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::Start(e) if current.is_some() && e.local_name().as_ref() == b"t" => {
                let text = read_text(&mut reader, QName(b"t"))?;
                if let Some(s) = current.as_mut() {
                    s.push_str(&text);
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"si" => {
                items.push(current.take().unwrap_or_default());
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(items)
}

fn parse_worksheet(xml: &str, shared_strings: &[String]) -> Result<Vec<Vec<Value>>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut rows: Vec<Vec<Value>> = Vec::new();
    let mut in_sheet_data = false;
    let mut current_row: Vec<Value> = Vec::new();
    let mut next_col = 0usize;

    // Per-cell state, reset on each <c>.
    let mut cell_col = 0usize;
    let mut cell_type: Option<String> = None;
    let mut value_text: Option<String> = None;
    let mut inline_text: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"sheetData" => in_sheet_data = true,
            Event::End(e) if e.local_name().as_ref() == b"sheetData" => in_sheet_data = false,

            Event::Start(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                current_row.clear();
                next_col = 0;
            }
            Event::Empty(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                rows.push(Vec::new());
            }
            Event::End(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                rows.push(std::mem::take(&mut current_row));
            }

            Event::Start(e) | Event::Empty(e)
                if in_sheet_data && e.local_name().as_ref() == b"c" =>
            {
                cell_col = next_col;
                cell_type = None;
                value_text = None;
                inline_text = None;
                for attr in e.attributes().with_checks(false) {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"r" => {
                            let a1 = attr.unescape_value()?.into_owned();
                            cell_col = column_index(&a1).ok_or_else(|| {
                                ScrubError::Format(format!("invalid cell reference '{a1}'"))
                            })?;
                        }
                        b"t" => cell_type = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                // An empty <c/> carries no value: no </c> event follows, so
                // nothing is placed and the cell stays missing.
                next_col = cell_col + 1;
            }

            Event::Start(e) if in_sheet_data && e.local_name().as_ref() == b"v" => {
                value_text = Some(read_text(&mut reader, QName(b"v"))?);
            }
            Event::Start(e) if in_sheet_data && e.local_name().as_ref() == b"is" => {
                inline_text = Some(read_inline_string(&mut reader)?);
            }
            // Cached formula text is irrelevant here; skip the subtree so its
            // content is not mistaken for a value.
            Event::Start(e) if in_sheet_data && e.local_name().as_ref() == b"f" => {
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }

            Event::End(e) if in_sheet_data && e.local_name().as_ref() == b"c" => {
                let value =
                    interpret_cell(cell_type.as_deref(), &value_text, &inline_text, shared_strings);
                place_cell(&mut current_row, cell_col, value);
            }

            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

/// SpreadsheetML cell decoding, keyed on the `t` attribute.
fn interpret_cell(
    t: Option<&str>,
    value_text: &Option<String>,
    inline_text: &Option<String>,
    shared_strings: &[String],
) -> Value {
    match t {
        Some("s") => {
            let idx: usize = value_text
                .as_deref()
                .unwrap_or_default()
                .parse()
                .unwrap_or(0);
            text_value(shared_strings.get(idx).cloned().unwrap_or_default())
        }
        Some("b") => Value::Bool(value_text.as_deref() == Some("1")),
        Some("str") => text_value(value_text.clone().unwrap_or_default()),
        Some("inlineStr") => text_value(inline_text.clone().unwrap_or_default()),
        // Excel error literals (#DIV/0! and friends) carry no usable value.
        Some("e") => Value::Missing,
        _ => match value_text {
            Some(raw) => match raw.parse::<f64>() {
                Ok(n) => Value::Number(n),
                // Numeric cell with a non-numeric payload is invalid
                // SpreadsheetML; keep the text rather than dropping it.
                Err(_) => text_value(raw.clone()),
            },
            None => Value::Missing,
        },
    }
}

/// Blank strings count as missing; whitespace-only strings survive so the
/// trimming stage sees them.
fn text_value(s: String) -> Value {
    if s.is_empty() {
        Value::Missing
    } else {
        Value::Text(s)
    }
}

fn place_cell(row: &mut Vec<Value>, col: usize, value: Value) {
    if row.len() <= col {
        row.resize(col + 1, Value::Missing);
    }
    row[col] = value;
}

/// Column part of an A1 reference ("BC12" -> 54). `None` when the reference
/// has no leading letters.
fn column_index(cell_ref: &str) -> Option<usize> {
    let mut col = 0usize;
    let mut saw_letter = false;
    for ch in cell_ref.chars() {
        if ch.is_ascii_alphabetic() {
            col = col * 26 + (ch.to_ascii_uppercase() as usize - 'A' as usize + 1);
            saw_letter = true;
        } else {
            break;
        }
    }
    saw_letter.then(|| col - 1)
}

/// Inline strings mirror shared-string items: `<is><t>..</t></is>`, possibly
/// with rich-text runs.
fn read_inline_string(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                text.push_str(&read_text(reader, QName(b"t"))?);
            }
            Event::Start(e) if e.local_name().as_ref() == b"rPh" => {
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"is" => break,
            Event::Eof => return Err(ScrubError::Format("unexpected eof in <is>".into())),
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

fn read_text(reader: &mut Reader<&[u8]>, end: QName<'_>) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => {
                let t: Cow<'_, str> = e.unescape()?;
                text.push_str(&t);
            }
            Event::CData(e) => {
                let t = std::str::from_utf8(e.as_ref())
                    .map_err(|err| ScrubError::Format(format!("workbook xml utf-8: {err}")))?;
                text.push_str(t);
            }
            Event::End(e) if e.name() == end => break,
            Event::Eof => {
                return Err(ScrubError::Format("unexpected eof in text element".into()))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// First row becomes the headers; the rest become data. All rows are padded
/// to the widest row so columns stay aligned.
fn table_from_rows(rows: Vec<Vec<Value>>) -> Result<Table> {
    if rows.is_empty() {
        return Ok(Table::default());
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut iter = rows.into_iter();
    let header_row = iter.next().unwrap_or_default();

    let mut headers: Vec<String> = header_row
        .iter()
        .map(|v| v.as_label().unwrap_or_default())
        .collect();
    headers.resize(width, String::new());

    let mut columns: Vec<Column> = headers
        .into_iter()
        .map(|name| Column::new(name, Vec::new()))
        .collect();
    for mut row in iter {
        row.resize(width, Value::Missing);
        for (column, cell) in columns.iter_mut().zip(row) {
            column.values.push(cell);
        }
    }
    Table::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_index_decodes_a1_letters() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("Z9"), Some(25));
        assert_eq!(column_index("AA10"), Some(26));
        assert_eq!(column_index("BC12"), Some(54));
        assert_eq!(column_index("12"), None);
    }

    #[test]
    fn shared_strings_concatenate_rich_runs() {
        let xml = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
            <si><t>plain</t></si>
            <si><r><rPr><b/></rPr><t>ri</t></r><r><t>ch</t></r></si>
        </sst>"#;
        let items = parse_shared_strings(xml).unwrap();
        assert_eq!(items, vec!["plain".to_string(), "rich".to_string()]);
    }

    #[test]
    fn worksheet_cells_decode_by_type() {
        let shared = vec!["Alice".to_string()];
        let xml = r#"<worksheet><sheetData>
            <row r="1">
                <c r="A1" t="s"><v>0</v></c>
                <c r="B1"><v>30</v></c>
                <c r="C1" t="b"><v>1</v></c>
                <c r="D1" t="inlineStr"><is><t>alice </t></is></c>
            </row>
            <row r="2">
                <c r="B2"><v>2.5</v></c>
            </row>
        </sheetData></worksheet>"#;
        let rows = parse_worksheet(xml, &shared).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            vec![
                Value::Text("Alice".into()),
                Value::Number(30.0),
                Value::Bool(true),
                Value::Text("alice ".into()),
            ]
        );
        // A2 absent from the second row: stays missing after padding.
        assert_eq!(rows[1], vec![Value::Missing, Value::Number(2.5)]);
    }

    #[test]
    fn formula_cells_use_cached_value_not_formula_text() {
        let xml = r#"<worksheet><sheetData>
            <row r="1"><c r="A1"><f>1+1</f><v>2</v></c></row>
        </sheetData></worksheet>"#;
        let rows = parse_worksheet(xml, &[]).unwrap();
        assert_eq!(rows[0], vec![Value::Number(2.0)]);
    }

    #[test]
    fn header_row_and_padding_shape_the_table() {
        let rows = vec![
            vec![Value::Text("Name".into()), Value::Text("Age".into())],
            vec![Value::Text("Alice".into()), Value::Number(30.0)],
            vec![Value::Text("Bob".into())],
        ];
        let table = table_from_rows(rows).unwrap();
        assert_eq!(table.headers(), vec!["Name", "Age"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.row(1), vec![Value::Text("Bob".into()), Value::Missing]);
    }

    #[test]
    fn empty_sheet_yields_empty_table() {
        let table = table_from_rows(Vec::new()).unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 0);
    }
}
