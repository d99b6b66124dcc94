//! Ingestion workflow: count, allocate, stream, populate, hash

use crate::error::{Result, TabscanError};
use crate::file_handler::{validate_file_path, FileMetrics};
use crate::ingest::reader::LineReader;
use crate::ingest::settings::ReaderSettings;
use crate::ingest::table::{ColumnSet, LineTable, LineTableBuilder};
use crate::parser::TextEncoding;
use crate::workflow::{
    LogObserver, ProgressKind, ProgressObserver, StepOutput, Workflow, WorkflowReport,
    WorkflowRunner, WorkflowStage, WorkflowStep,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::fs::File;
use tokio::io::BufReader;
use tokio::sync::mpsc;

pub const READ_FILE_STAGE: &str = "read file";
pub const FILE_CONTENT_STAGE: &str = "file content";

/// Consecutive data lines plus the table offset of the first one.
///
/// The offset is assigned by the producer before the batch is queued, so workers
/// never coordinate an index among themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBatch {
    pub offset: usize,
    pub lines: Vec<Box<[u8]>>,
}

/// Everything produced by one ingestion run
#[derive(Debug, Clone)]
pub struct IngestionResult {
    pub path: PathBuf,
    pub delimiter: u8,
    pub encoding: TextEncoding,
    pub columns: ColumnSet,
    /// Shared so search chunks can borrow it from blocking tasks
    pub lines: Arc<LineTable>,
    pub content_hash: String,
    pub report: WorkflowReport,
}

impl IngestionResult {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Restore every column to selected, without ordering
    pub fn reset_columns(&mut self) {
        self.columns.reset();
    }

    /// Release the line table, keeping the column layout and identity
    pub fn clear_lines(&mut self) {
        self.lines = Arc::new(LineTable::default());
    }
}

/// Shared state threaded through the ingestion steps
struct IngestContext {
    path: PathBuf,
    settings: ReaderSettings,
    metrics: FileMetrics,
    table: OnceLock<Arc<LineTableBuilder>>,
    columns: OnceLock<ColumnSet>,
    content_hash: OnceLock<String>,
    sender: Mutex<Option<mpsc::Sender<LineBatch>>>,
    receiver: Mutex<Option<mpsc::Receiver<LineBatch>>>,
}

impl IngestContext {
    fn new(path: PathBuf, settings: ReaderSettings) -> Self {
        let metrics = FileMetrics::with_buffer_size(path.clone(), settings.read_buffer_size);
        Self {
            path,
            settings,
            metrics,
            table: OnceLock::new(),
            columns: OnceLock::new(),
            content_hash: OnceLock::new(),
            sender: Mutex::new(None),
            receiver: Mutex::new(None),
        }
    }

    fn table(&self) -> Result<Arc<LineTableBuilder>> {
        self.table
            .get()
            .cloned()
            .ok_or_else(|| TabscanError::invariant("line table has not been allocated"))
    }
}

/// Loads a delimited file fully into memory.
///
/// Progress is reported to the configured observer; by default events go to the
/// `log` facade.
pub struct InMemoryFileReader {
    path: PathBuf,
    settings: ReaderSettings,
    observer: Arc<dyn ProgressObserver>,
}

impl InMemoryFileReader {
    pub fn new(path: impl Into<PathBuf>, settings: ReaderSettings) -> Self {
        Self {
            path: path.into(),
            settings,
            observer: Arc::new(LogObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run the ingestion workflow
    ///
    /// # Returns
    /// * The populated line table, header columns and content hash
    ///
    /// # Errors
    /// * I/O failures abort the run and no partial table is returned
    /// * Stage failures are wrapped in `StepFailed` with the stage and step name
    pub async fn read(self) -> Result<IngestionResult> {
        self.settings.validate()?;
        validate_file_path(&self.path)?;

        let context = Arc::new(IngestContext::new(self.path.clone(), self.settings.clone()));
        let mut workflow = build_workflow();
        let runner = WorkflowRunner::new(Arc::clone(&self.observer));
        let report = runner.execute(&mut workflow, Arc::clone(&context)).await?;
        drop(workflow);

        let context = Arc::try_unwrap(context)
            .map_err(|_| TabscanError::invariant("ingestion context still shared after workflow"))?;

        let builder = context
            .table
            .into_inner()
            .ok_or_else(|| TabscanError::invariant("line table has not been allocated"))?;
        let builder = Arc::try_unwrap(builder)
            .map_err(|_| TabscanError::invariant("line table still shared after workers finished"))?;
        let columns = context
            .columns
            .into_inner()
            .ok_or_else(|| TabscanError::invariant("header was not parsed"))?;
        let content_hash = context
            .content_hash
            .into_inner()
            .ok_or_else(|| TabscanError::invariant("content hash was not calculated"))?;

        Ok(IngestionResult {
            path: self.path,
            delimiter: self.settings.delimiter,
            encoding: self.settings.encoding,
            columns,
            lines: Arc::new(builder.into_table()),
            content_hash,
            report,
        })
    }
}

/// Ingest `path` with the log observer
pub async fn ingest(path: impl AsRef<Path>, settings: ReaderSettings) -> Result<IngestionResult> {
    InMemoryFileReader::new(path.as_ref(), settings).read().await
}

fn build_workflow() -> Workflow<IngestContext> {
    let read_file = WorkflowStage::new(READ_FILE_STAGE)
        .step(
            WorkflowStep::new("PrintReaderInfo", "Reader settings", print_reader_info)
                .with_progress(ProgressKind::Message),
        )
        .step(WorkflowStep::new(
            "CountLinesInFile",
            "Counting lines in file",
            count_lines_in_file,
        ))
        .step(WorkflowStep::new(
            "InitializeDataStructures",
            "Initializing data structures",
            initialize_data_structures,
        ))
        .step(WorkflowStep::new("StartWorkers", "Starting workers", start_workers).parallel())
        .step(WorkflowStep::new(
            "ReadLinesFromFile",
            "Reading lines from file",
            read_lines_from_file,
        ));

    let file_content = WorkflowStage::new(FILE_CONTENT_STAGE).step(WorkflowStep::new(
        "CalculateFileHash",
        "Calculating file hash",
        calculate_file_hash,
    ));

    Workflow::new().stage(read_file).stage(file_content)
}

async fn print_reader_info(context: Arc<IngestContext>) -> Result<StepOutput> {
    let settings = &context.settings;
    Ok(StepOutput::new("Reader settings:").with_value(format!(
        "file {}, delimiter '{}', encoding {}, {} workers, {} lines per batch, {} byte buffer",
        context.path.display(),
        char::from(settings.delimiter),
        settings.encoding,
        settings.worker_count,
        settings.lines_batch_size,
        settings.read_buffer_size
    )))
}

async fn count_lines_in_file(context: Arc<IngestContext>) -> Result<StepOutput> {
    let started = Instant::now();
    let count = context.metrics.count_lines().await?;

    Ok(StepOutput::new("Lines in file:")
        .with_value(count.to_string())
        .with_elapsed(started.elapsed()))
}

async fn initialize_data_structures(context: Arc<IngestContext>) -> Result<StepOutput> {
    let count = context
        .metrics
        .cached_line_count()
        .ok_or_else(|| TabscanError::invariant("line count is not available"))?;
    let data_lines = usize::try_from(count.saturating_sub(1))
        .map_err(|_| TabscanError::invariant(format!("{count} lines do not fit in memory")))?;

    context
        .table
        .set(Arc::new(LineTableBuilder::new(data_lines)))
        .map_err(|_| TabscanError::invariant("line table allocated twice"))?;

    let (sender, receiver) = mpsc::channel(context.settings.queue_capacity);
    *context.sender.lock() = Some(sender);
    *context.receiver.lock() = Some(receiver);

    Ok(StepOutput::new("Line slots allocated:").with_value(data_lines.to_string()))
}

async fn start_workers(context: Arc<IngestContext>) -> Result<StepOutput> {
    let started = Instant::now();
    let table = context.table()?;
    let receiver = context
        .receiver
        .lock()
        .take()
        .ok_or_else(|| TabscanError::invariant("batch queue has not been created"))?;
    let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

    let handles: Vec<_> = (0..context.settings.worker_count)
        .map(|worker| {
            tokio::spawn(run_worker(
                worker,
                Arc::clone(&receiver),
                Arc::clone(&table),
            ))
        })
        .collect();
    drop(receiver);

    let mut written = 0usize;
    for joined in futures::future::join_all(handles).await {
        let lines = joined
            .map_err(|e| TabscanError::other(format!("Worker task did not complete: {e}")))??;
        written += lines;
    }

    Ok(StepOutput::new("Workers completed processing")
        .with_value(format!("{written} lines"))
        .with_elapsed(started.elapsed()))
}

/// Drain batches until the queue is closed and empty
async fn run_worker(
    worker: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<LineBatch>>>,
    table: Arc<LineTableBuilder>,
) -> Result<usize> {
    let mut written = 0;

    loop {
        let batch = receiver.lock().await.recv().await;
        let Some(batch) = batch else { break };

        let lines = batch.lines.len();
        table.fill(batch.offset, batch.lines)?;
        written += lines;
    }

    log::debug!("Worker {worker} wrote {written} lines");
    Ok(written)
}

async fn read_lines_from_file(context: Arc<IngestContext>) -> Result<StepOutput> {
    let started = Instant::now();
    let settings = &context.settings;
    let capacity = context.table()?.len();
    let sender = context
        .sender
        .lock()
        .take()
        .ok_or_else(|| TabscanError::invariant("batch queue has not been created"))?;

    let file = File::open(&context.path).await.map_err(|e| {
        TabscanError::file_error(format!("Failed to open {}", context.path.display()), e)
    })?;
    let mut reader = LineReader::new(BufReader::with_capacity(settings.read_buffer_size, file));
    let read_error = |e: std::io::Error| {
        TabscanError::file_error(format!("Failed to read {}", context.path.display()), e)
    };

    let columns = match reader.next_line().await.map_err(read_error)? {
        Some(header) => ColumnSet::from_header(&header, settings.delimiter, settings.encoding),
        None => ColumnSet::default(),
    };
    log::debug!("Header has {} columns", columns.len());
    context
        .columns
        .set(columns)
        .map_err(|_| TabscanError::invariant("header parsed twice"))?;

    let batch_size = settings.lines_batch_size;
    let mut batch = Vec::with_capacity(batch_size.min(capacity));
    let mut offset = 0;
    let mut lines_read = 0;

    while let Some(line) = reader.next_line().await.map_err(read_error)? {
        if lines_read == capacity {
            return Err(TabscanError::invariant(format!(
                "file has more than the {capacity} data lines counted before reading"
            )));
        }
        batch.push(line.into_boxed_slice());
        lines_read += 1;

        if batch.len() == batch_size {
            let full = std::mem::replace(
                &mut batch,
                Vec::with_capacity(batch_size.min(capacity - lines_read)),
            );
            queue_batch(&sender, offset, full).await?;
            offset = lines_read;
        }
    }

    if !batch.is_empty() {
        queue_batch(&sender, offset, batch).await?;
    }
    drop(sender);

    if lines_read < capacity {
        log::warn!(
            "Read {lines_read} data lines but {capacity} were counted; remaining slots stay empty"
        );
    }

    Ok(StepOutput::new("Lines read:")
        .with_value(lines_read.to_string())
        .with_elapsed(started.elapsed()))
}

async fn queue_batch(
    sender: &mpsc::Sender<LineBatch>,
    offset: usize,
    lines: Vec<Box<[u8]>>,
) -> Result<()> {
    sender
        .send(LineBatch { offset, lines })
        .await
        .map_err(|_| TabscanError::invariant("worker pool stopped before all batches were queued"))
}

async fn calculate_file_hash(context: Arc<IngestContext>) -> Result<StepOutput> {
    let started = Instant::now();
    let hash = context.metrics.content_hash().await?;
    context
        .content_hash
        .set(hash.clone())
        .map_err(|_| TabscanError::invariant("content hash calculated twice"))?;

    Ok(StepOutput::new("File hash:")
        .with_value(hash)
        .with_elapsed(started.elapsed()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{ProgressEvent, RecordingObserver};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn raw_lines(result: &IngestionResult) -> Vec<Option<Vec<u8>>> {
        result
            .lines
            .iter()
            .map(|slot| slot.raw().map(<[u8]>::to_vec))
            .collect()
    }

    #[tokio::test]
    async fn test_ingests_header_and_lines() {
        let file = write_file("id;fruit;color\n1;apple;red\n2;banana;yellow\n3;apple;green\n");
        let settings = ReaderSettings::new(b';').with_worker_count(2).with_lines_batch_size(2);

        let result = ingest(file.path(), settings).await.unwrap();

        let names: Vec<_> = result.columns.iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["id", "fruit", "color"]);
        assert_eq!(result.line_count(), 3);
        assert_eq!(
            raw_lines(&result),
            vec![
                Some(b"1;apple;red".to_vec()),
                Some(b"2;banana;yellow".to_vec()),
                Some(b"3;apple;green".to_vec()),
            ]
        );
        assert_eq!(result.content_hash.len(), 128);
    }

    #[tokio::test]
    async fn test_reports_steps_in_order() {
        let file = write_file("a;b\n1;2\n");
        let observer = Arc::new(RecordingObserver::new());
        let settings = ReaderSettings::new(b';').with_worker_count(1);

        let result = InMemoryFileReader::new(file.path(), settings)
            .with_observer(observer.clone())
            .read()
            .await
            .unwrap();

        let started: Vec<_> = observer
            .events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Started { step, .. } => Some(step),
                _ => None,
            })
            .collect();
        assert_eq!(started[0], "PrintReaderInfo");
        assert_eq!(started[1], "CountLinesInFile");
        assert_eq!(started[2], "InitializeDataStructures");
        assert_eq!(started.last().map(String::as_str), Some("CalculateFileHash"));

        let read = result.report.step("ReadLinesFromFile").unwrap();
        assert_eq!(read.output.value.as_deref(), Some("1"));
        let counted = result.report.step("CountLinesInFile").unwrap();
        assert_eq!(counted.output.value.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_header_only_file() {
        let file = write_file("a;b;c\n");
        let result = ingest(file.path(), ReaderSettings::new(b';')).await.unwrap();
        assert_eq!(result.column_count(), 3);
        assert!(result.lines.is_empty());
    }

    #[tokio::test]
    async fn test_empty_file() {
        let file = write_file("");
        let result = ingest(file.path(), ReaderSettings::new(b';')).await.unwrap();
        assert!(result.columns.is_empty());
        assert!(result.lines.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_settings_rejected_before_reading() {
        let file = write_file("a\n1\n");
        let err = ingest(file.path(), ReaderSettings::new(b';').with_worker_count(0))
            .await
            .unwrap_err();
        assert!(matches!(err, TabscanError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_reset_and_clear() {
        let file = write_file("a;b\n1;2\n");
        let mut result = ingest(file.path(), ReaderSettings::new(b';')).await.unwrap();
        result.columns.select_output(&[1]).unwrap();
        result.reset_columns();
        assert_eq!(result.columns.selected_indexes(), vec![0, 1]);

        result.clear_lines();
        assert!(result.lines.is_empty());
        assert_eq!(result.column_count(), 2);
    }
}
