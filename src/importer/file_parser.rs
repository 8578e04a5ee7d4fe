// ==========================================
// 商品目录同步 - 文件解析器实现
// ==========================================
// 职责: 文件读取与解析 → 原始行记录
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// ==========================================

use crate::importer::catalog_importer_trait::{FileParser, RawRow};
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook, Reader, Xlsx};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// 判定为商品导出格式所需的列（任一即可）
pub const EXPORT_FORMAT_MARKERS: [&str; 4] =
    ["sku", "product_type", "configurable_variations", "visibility"];

/// 检测表头是否为商品导出格式
pub fn detect_export_format<'a, I>(headers: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    headers
        .into_iter()
        .any(|h| EXPORT_FORMAT_MARKERS.contains(&h.trim()))
}

/// 校验已解析记录的导出格式
pub fn ensure_export_format(records: &[RawRow]) -> ImportResult<()> {
    let recognized = records
        .first()
        .map(|r| detect_export_format(r.keys().map(String::as_str)))
        .unwrap_or(false);

    if recognized {
        Ok(())
    } else {
        Err(ImportError::UnrecognizedFormat {
            expected: EXPORT_FORMAT_MARKERS.join("/"),
        })
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 从任意读取源解析（文本导入 / 测试）
    pub fn parse_reader<R: Read>(&self, source: R) -> ImportResult<Vec<RawRow>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(source);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row_map = RawRow::new();

            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    row_map.insert(header.clone(), value.trim().to_string());
                }
            }

            // 跳过完全空白的行
            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }

            records.push(row_map);
        }

        Ok(records)
    }

    /// 从文本内容解析
    pub fn parse_str(&self, content: &str) -> ImportResult<Vec<RawRow>> {
        self.parse_reader(content.as_bytes())
    }
}

impl FileParser for CsvParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRow>> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        if let Some(ext) = file_path.extension() {
            if !ext.eq_ignore_ascii_case("csv") {
                return Err(ImportError::UnsupportedFormat(
                    ext.to_string_lossy().to_string(),
                ));
            }
        }

        let file = File::open(file_path)?;
        self.parse_reader(file)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRow>> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook: Xlsx<_> = open_workbook(file_path)?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        // 提取表头（第一行）
        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无数据行".to_string()))?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let mut records = Vec::new();
        for data_row in rows {
            let mut row_map = RawRow::new();

            for (col_idx, cell) in data_row.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    row_map.insert(header.clone(), cell.to_string().trim().to_string());
                }
            }

            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }

            records.push(row_map);
        }

        Ok(records)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRow>> {
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse_to_raw_records(file_path),
            "xlsx" | "xls" => ExcelParser.parse_to_raw_records(file_path),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_csv_parser_valid_file() {
        let mut temp_file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(temp_file, "sku,name,price").unwrap();
        writeln!(temp_file, "A-1,Alpha,2.5").unwrap();
        writeln!(temp_file, "B-1, Beta ,3.0").unwrap();

        let records = CsvParser.parse_to_raw_records(temp_file.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("sku"), Some(&"A-1".to_string()));
        assert_eq!(records[1].get("name"), Some(&"Beta".to_string()));
    }

    #[test]
    fn test_csv_parser_quoted_variations_field() {
        let content = "sku,name,configurable_variations\n\
                       TS-1,Shirt,\"sku=TS-1-S,color=Black|sku=TS-1-M,color=Black\"\n";
        let records = CsvParser.parse_str(content).unwrap();
        assert_eq!(
            records[0].get("configurable_variations").map(String::as_str),
            Some("sku=TS-1-S,color=Black|sku=TS-1-M,color=Black")
        );
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse_to_raw_records(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let records = CsvParser.parse_str("sku,name\nA,Alpha\n,\nB,Beta\n").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let temp_file = NamedTempFile::new().unwrap();
        let result = UniversalFileParser.parse_to_raw_records(temp_file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_detect_export_format() {
        assert!(detect_export_format(["id", "sku", "name"]));
        assert!(detect_export_format([" visibility "]));
        assert!(!detect_export_format(["material_id", "weight"]));

        let records = CsvParser.parse_str("material_id,weight\nM1,2\n").unwrap();
        assert!(matches!(
            ensure_export_format(&records),
            Err(ImportError::UnrecognizedFormat { .. })
        ));
        assert!(ensure_export_format(&[]).is_err());
    }
}
