//! Matrix export (CSV, TSV, JSON)
//!
//! Every format uses the fixed 52-column layout of [`MATRIX_HEADER`]. CSV
//! quotes every field; TSV quotes only fields containing a tab, quote or line
//! break; JSON is `{"columns": [...], "rows": [[...], ...]}`.

use serde_json::Value;
use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::NerError;
use crate::types::EntityClass;

use super::{EvidenceMatrix, MatrixRow};

pub const MATRIX_HEADER: [&str; 52] = [
    "IS_NAMED_ENTITY",
    "ID_SENT",
    "ID_WORD",
    "TOKEN",
    "POS_UNI",
    "POS",
    "NER",
    "COMPOUND",
    "COMPOUND_SIZE",
    "ID_TERM_TXT",
    "ID_TERM_IMG",
    "TOT_IMG",
    "TOT_CV_LOC",
    "TOT_CV_ORG",
    "TOT_CV_PER",
    "DIST_CV_I",
    "PL_CV_I",
    "NR_RESULTS_SE_IMG",
    "KLASS_PREDICT_CV",
    "TOT_RESULTS_TX",
    "TOT_TX_LOC",
    "TOT_TX_ORG",
    "TOT_TX_PER",
    "TOT_ERR_TRANS",
    "DIST_TX_I",
    "NR_RESULTS_SE_TX",
    "KLASS_PREDICT_TX",
    "FEATURE_EXTRA_1",
    "FEATURE_EXTRA_2",
    "FEATURE_EXTRA_3",
    "FEATURE_EXTRA_4",
    "FEATURE_EXTRA_5",
    "FEATURE_EXTRA_6",
    "FEATURE_EXTRA_7",
    "FEATURE_EXTRA_8",
    "FEATURE_EXTRA_9",
    "KLASS_1",
    "KLASS_2",
    "KLASS_3",
    "KLASS_4",
    "KLASS_5",
    "KLASS_6",
    "KLASS_7",
    "KLASS_8",
    "KLASS_9",
    "KLASS_10",
    "KLASS_11",
    "KLASS_12",
    "KLASS_13",
    "KLASS_14",
    "KLASS_15",
    "KLASS_REAL",
];

/// Reserved feature columns FEATURE_EXTRA_2..9
const RESERVED_FEATURES: usize = 8;
/// Reserved class slots KLASS_5..15
const RESERVED_CLASS_SLOTS: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Tsv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = NerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "tsv" => Ok(ExportFormat::Tsv),
            "json" => Ok(ExportFormat::Json),
            other => Err(NerError::Configuration(format!(
                "unsupported export format '{}'",
                other
            ))),
        }
    }
}

enum Cell {
    Int(i64),
    Text(String),
}

impl Cell {
    fn class(class: Option<EntityClass>) -> Self {
        Cell::Text(class.unwrap_or(EntityClass::O).as_str().to_string())
    }

    fn render(&self) -> String {
        match self {
            Cell::Int(v) => v.to_string(),
            Cell::Text(s) => s.clone(),
        }
    }

    fn into_json(self) -> Value {
        match self {
            Cell::Int(v) => Value::from(v),
            Cell::Text(s) => Value::from(s),
        }
    }
}

/// Row in header order
fn row_cells(row: &MatrixRow) -> Vec<Cell> {
    let mut cells = vec![
        Cell::Int(row.is_entity_gold.as_i64()),
        Cell::Int(row.sentence_id as i64),
        Cell::Int(row.word_index as i64),
        Cell::Text(row.surface_form.clone()),
        Cell::Text(row.pos_universal.clone()),
        Cell::Text(row.pos.clone()),
        Cell::class(Some(row.ner_tag)),
        Cell::Int(row.is_compound as i64),
        Cell::Int(row.compound_size as i64),
        Cell::Int(row.term_doc_id.unwrap_or(0)),
        Cell::Int(row.term_img_id.unwrap_or(0)),
        Cell::Int(row.image.total),
        Cell::Int(row.image.loc),
        Cell::Int(row.image.org),
        Cell::Int(row.image.per),
        Cell::Int(row.image.distance),
        Cell::Int(row.image.polarity),
        Cell::Int(row.image.results_returned),
        Cell::class(Some(row.image.predicted)),
        Cell::Int(row.text.total),
        Cell::Int(row.text.loc),
        Cell::Int(row.text.org),
        Cell::Int(row.text.per),
        Cell::Int(row.text.translation_errors),
        Cell::Int(row.text.distance),
        Cell::Int(row.text.results_returned),
        Cell::class(Some(row.text.predicted)),
        Cell::Int(row.index_start_term as i64),
    ];
    cells.extend((0..RESERVED_FEATURES).map(|_| Cell::Int(0)));
    cells.push(Cell::class(row.predictions.theta));
    cells.push(Cell::class(row.predictions.theta_plus_one));
    cells.push(Cell::class(row.predictions.theta_plus_two));
    cells.push(Cell::class(row.predictions.compound));
    cells.extend((0..RESERVED_CLASS_SLOTS).map(|_| Cell::class(None)));
    cells.push(Cell::class(Some(row.gold_class)));
    cells
}

fn quote_all(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn quote_minimal(field: &str) -> String {
    if field.contains(['\t', '"', '\n', '\r']) {
        quote_all(field)
    } else {
        field.to_string()
    }
}

fn write_delimited<W: Write>(
    matrix: &EvidenceMatrix,
    writer: &mut W,
    delimiter: &str,
    quote: fn(&str) -> String,
) -> std::io::Result<()> {
    let header: Vec<String> = MATRIX_HEADER.iter().map(|h| quote(h)).collect();
    writeln!(writer, "{}", header.join(delimiter))?;
    for row in matrix.rows() {
        let fields: Vec<String> = row_cells(row).iter().map(|c| quote(&c.render())).collect();
        writeln!(writer, "{}", fields.join(delimiter))?;
    }
    Ok(())
}

/// Serialize the matrix to `writer`
pub fn write_matrix<W: Write>(
    matrix: &EvidenceMatrix,
    format: ExportFormat,
    writer: &mut W,
) -> Result<(), NerError> {
    match format {
        ExportFormat::Csv => write_delimited(matrix, writer, ",", quote_all)?,
        ExportFormat::Tsv => write_delimited(matrix, writer, "\t", quote_minimal)?,
        ExportFormat::Json => {
            let rows: Vec<Value> = matrix
                .rows()
                .iter()
                .map(|row| Value::Array(row_cells(row).into_iter().map(Cell::into_json).collect()))
                .collect();
            let document = serde_json::json!({
                "columns": MATRIX_HEADER.to_vec(),
                "rows": rows,
            });
            serde_json::to_writer(&mut *writer, &document)?;
        }
    }
    Ok(())
}

/// Output file name for a corpus: `<corpus file name>.horus.<format>`
pub fn export_file_name(corpus: &Path, format: ExportFormat) -> String {
    let name = corpus
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "corpus".to_string());
    format!("{}.horus.{}", name, format.extension())
}

/// Write the matrix into `output_dir`, returning the file path
pub fn export_matrix(
    matrix: &EvidenceMatrix,
    output_dir: &Path,
    corpus: &Path,
    format: ExportFormat,
) -> Result<PathBuf, NerError> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(export_file_name(corpus, format));

    let file = std::fs::File::create(&path)?;
    let mut writer = BufWriter::new(file);
    write_matrix(matrix, format, &mut writer)?;
    writer.flush()?;

    tracing::info!(path = %path.display(), rows = matrix.len(), %format, "Matrix exported");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::test_rows::{compound, token};

    fn sample_matrix() -> EvidenceMatrix {
        let mut matrix = EvidenceMatrix::new();
        let mut paris = token(1, 1, "Paris", "NNP");
        paris.term_doc_id = Some(11);
        paris.term_img_id = Some(12);
        paris.image.loc = 7;
        paris.image.distance = 6;
        paris.image.predicted = EntityClass::Loc;
        paris.predictions.theta = Some(EntityClass::Loc);
        paris.index_start_term = 0;
        let mut says = token(1, 2, "says \"hi\"", "VBZ");
        says.index_start_term = 6;
        matrix.extend_sentence(vec![compound(1, 1, "Paris says", 2), paris, says]);
        matrix
    }

    fn render(format: ExportFormat) -> String {
        let mut out = Vec::new();
        write_matrix(&sample_matrix(), format, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_header_layout() {
        assert_eq!(MATRIX_HEADER.len(), 52);
        assert_eq!(MATRIX_HEADER[27], "FEATURE_EXTRA_1");
        assert_eq!(MATRIX_HEADER[36], "KLASS_1");
        assert_eq!(MATRIX_HEADER[51], "KLASS_REAL");
    }

    #[test]
    fn test_row_has_one_cell_per_column() {
        let matrix = sample_matrix();
        for row in matrix.rows() {
            assert_eq!(row_cells(row).len(), MATRIX_HEADER.len());
        }
    }

    #[test]
    fn test_csv_quotes_every_field() {
        let csv = render(ExportFormat::Csv);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("\"IS_NAMED_ENTITY\",\"ID_SENT\""));
        assert!(lines[2].starts_with("\"-1\",\"1\",\"1\",\"Paris\",\"PROPN\",\"NNP\",\"O\",\"0\",\"1\",\"11\",\"12\""));
        assert!(lines[3].contains("\"says \"\"hi\"\"\""));
    }

    #[test]
    fn test_tsv_reserved_columns() {
        let tsv = render(ExportFormat::Tsv);
        let paris: Vec<&str> = tsv.lines().nth(2).unwrap().split('\t').collect();

        assert_eq!(paris.len(), 52);
        assert_eq!(paris[12], "7");
        assert_eq!(paris[18], "LOC");
        assert_eq!(paris[27], "0");
        assert!(paris[28..36].iter().all(|v| *v == "0"));
        assert_eq!(paris[36], "LOC");
        assert_eq!(paris[37], "O");
        assert!(paris[40..51].iter().all(|v| *v == "O"));
        assert_eq!(paris[51], "O");
    }

    #[test]
    fn test_json_export() {
        let json: Value = serde_json::from_str(&render(ExportFormat::Json)).unwrap();

        assert_eq!(json["columns"].as_array().unwrap().len(), 52);
        let rows = json["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][7], Value::from(1));
        assert_eq!(rows[1][3], Value::from("Paris"));
        assert_eq!(rows[2][27], Value::from(6));
    }

    #[test]
    fn test_export_file_name() {
        let name = export_file_name(Path::new("/data/wnut17.conll"), ExportFormat::Tsv);
        assert_eq!(name, "wnut17.conll.horus.tsv");
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
