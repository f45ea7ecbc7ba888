use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::AdminError;
use crate::record::{FieldValue, Record};

// Stand-in for the remote data layer: an already fetched collection,
// read from disk. The view engine never sees any polars type.

#[derive(Debug)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// A loaded record collection plus its field names in source order.
pub struct Collection {
    pub field_names: Vec<String>,
    pub records: Vec<Record>,
}

pub fn load_collection(path: PathBuf) -> Result<Collection, AdminError> {
    let file_info = get_file_info(path)?;
    let frame = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::PARQUET => load_parquet(&file_info.path)?,
        FileType::ARROW => load_arrow(&file_info.path)?,
    };

    // Convert column-wise in parallel; the engine wants row records, so
    // the columns get zipped back together afterwards.
    let start_time = Instant::now();
    let df = frame.collect()?;
    let field_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let c_: Result<Vec<(String, Vec<FieldValue>)>, PolarsError> = field_names
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let columns = c_?;

    let mut records = Vec::with_capacity(df.height());
    for ridx in 0..df.height() {
        let mut record = Record::new();
        for (name, values) in &columns {
            record.insert(name.clone(), values[ridx].clone());
        }
        records.push(record);
    }

    let data_loading_duration = start_time.elapsed().as_millis();
    info!(
        "Loaded {} records ({} bytes) in {}ms",
        records.len(),
        file_info.file_size,
        data_loading_duration
    );

    Ok(Collection {
        field_names,
        records,
    })
}

fn load_column(df: &DataFrame, name: &str) -> Result<(String, Vec<FieldValue>), PolarsError> {
    let col = df.column(name)?;
    let dtype = col.dtype().clone();
    debug!("Column \"{}\": {:?}, {} rows", name, dtype, col.len());

    let values: Vec<FieldValue> = if is_numeric_type(&dtype) {
        // Numeric dtypes stay numeric so the sort stage can compare them
        // as numbers instead of text.
        let col = col.cast(&DataType::Float64)?;
        col.f64()?
            .into_iter()
            .map(|v| v.map(FieldValue::Num).unwrap_or(FieldValue::Null))
            .collect()
    } else if matches!(dtype, DataType::Boolean) {
        col.bool()?
            .into_iter()
            .map(|v| v.map(FieldValue::Bool).unwrap_or(FieldValue::Null))
            .collect()
    } else {
        let col = col.cast(&DataType::String)?;
        col.str()?
            .into_iter()
            .map(|v| match v {
                Some(s) => FieldValue::Str(s.replace("\r\n", " ↵ ").replace("\n", " ↵ ")),
                None => FieldValue::Null,
            })
            .collect()
    };

    Ok((name.to_string(), values))
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn detect_file_type(path: &Path) -> Result<FileType, AdminError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(AdminError::UnknownFileType),
    }
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, AdminError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => AdminError::FileNotFound,
        ErrorKind::PermissionDenied => AdminError::PermissionDenied,
        _ => AdminError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(AdminError::LoadingFailed("Not a file!".into()));
    }

    let file_size = metadata.len();
    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size,
        file_type,
    })
}

fn load_csv(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.as_path().into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(
        PlPath::Local(path.as_path().into()),
        ScanArgsParquet::default(),
    )
}

fn load_arrow(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.as_path().into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}
