// ==========================================
// 商品目录同步 - 导入层
// ==========================================
// 职责: 外部导出文件 → 商品森林 + 导入报告；森林 → 导出文件
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod catalog_importer_impl;
pub mod catalog_importer_trait;
pub mod conflict_handler;
pub mod data_cleaner;
pub mod error;
pub mod exporter;
pub mod field_mapper;
pub mod file_parser;
pub mod tree_builder;
pub mod variation_parser;

// 重导出核心类型
pub use catalog_importer_impl::CatalogImporterImpl;
pub use conflict_handler::ConflictHandler as ConflictHandlerImpl;
pub use data_cleaner::DataCleaner as DataCleanerImpl;
pub use error::{ImportError, ImportResult};
pub use exporter::CatalogExporter;
pub use field_mapper::FieldMapper as FieldMapperImpl;
pub use file_parser::{detect_export_format, CsvParser, ExcelParser, UniversalFileParser};
pub use tree_builder::{TreeBuild, TreeBuilder};
pub use variation_parser::VariationParser;

// 重导出 Trait 接口
pub use catalog_importer_trait::{
    CatalogImporter, ConflictHandler, DataCleaner, FieldMapper, FileParser, RawRow,
};
