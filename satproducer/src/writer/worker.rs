//! The background writer.

use super::placement::{default_mode, encode_into, link_or_copy};
use super::queue::{TaskDone, WorkItem, WriteQueue};
use super::WriteError;
use crate::announce::{Announcement, Announcer};
use crate::artifact::{write_thumbnail, Artifact, Overlay, SaveOptions};
use crate::product::{parse_thumbnail_size, Attributes, OutputSpec};
use crate::template::{compose, Params};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Attributes that only decide where a rendering goes, not what it looks like.
const PLACEMENT_KEYS: &[&str] = &["output_dir", "thumbnail_name", "thumbnail_size"];

const DEFAULT_COMPRESSION: u8 = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct WriterOptions {
    /// How long the worker waits on an empty queue before checking for stop.
    pub poll_interval: Duration,
    /// Announcement subject template; `None` uses `/<format>/<level>`.
    pub publish_topic: Option<String>,
    /// Extra attempts for a failed link or copy.
    pub link_retries: u32,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            publish_topic: None,
            link_retries: 1,
        }
    }
}

/// Outcome of one batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Files in place, in output order.
    pub placed: Vec<PathBuf>,
    /// Outputs abandoned after their retries ran out.
    pub failed: Vec<PathBuf>,
}

/// Outputs sharing one rendering.
struct RenderGroup<'a> {
    key: Attributes,
    outputs: Vec<&'a OutputSpec>,
}

/// Group outputs by their rendering attributes, in order of first appearance.
fn group_outputs(outputs: &[OutputSpec]) -> Vec<RenderGroup<'_>> {
    let mut groups: Vec<RenderGroup<'_>> = Vec::new();
    for spec in outputs {
        let mut key = spec.attrs.without(PLACEMENT_KEYS);
        if !key.contains("format") {
            if let Some(format) = spec.format() {
                key.insert("format", format);
            }
        }
        match groups.iter_mut().find(|g| g.key == key) {
            Some(group) => group.outputs.push(spec),
            None => groups.push(RenderGroup {
                key,
                outputs: vec![spec],
            }),
        }
    }
    groups
}

/// The spec's own `output_dir`, else the `output_dir` parameter.
fn output_dir<'a>(spec: &'a OutputSpec, params: &'a Params) -> Result<&'a str, WriteError> {
    spec.attrs
        .get("output_dir")
        .or_else(|| params.get_str("output_dir"))
        .ok_or_else(|| WriteError::NoOutputDir(spec.filename.clone()))
}

/// Destination of `spec` with `params` substituted.
pub fn output_path(spec: &OutputSpec, params: &Params) -> Result<PathBuf, WriteError> {
    let dir = output_dir(spec, params)?;
    let template = Path::new(dir).join(&spec.filename);
    Ok(PathBuf::from(compose(&template.to_string_lossy(), params)?))
}

/// Writes batches synchronously. [`ArtifactWriter`] runs one on its thread.
pub struct BatchWriter {
    announcer: Box<dyn Announcer>,
    publish_topic: Option<String>,
    link_retries: u32,
    mode: Option<u32>,
}

impl BatchWriter {
    pub fn new(announcer: Box<dyn Announcer>, options: &WriterOptions) -> Self {
        Self {
            announcer,
            publish_topic: options.publish_topic.clone(),
            link_retries: options.link_retries,
            mode: default_mode(),
        }
    }

    /// Place every output of `item` and announce each placed file.
    ///
    /// A failure of one output is logged and recorded in the report. An error
    /// return means the rest of the batch was abandoned.
    pub fn process(&mut self, item: &mut WorkItem) -> Result<BatchReport, WriteError> {
        let params = item.parameters.resolve_aliases();
        let mut report = BatchReport::default();

        for group in group_outputs(&item.outputs) {
            if let Some(raw) = group.key.get("overlay").filter(|v| !v.trim().is_empty()) {
                let overlay = Overlay::parse(raw).map_err(WriteError::Overlay)?;
                debug!(overlay = ?overlay, "Adding overlay");
                item.artifact
                    .add_overlay(&overlay)
                    .map_err(WriteError::Overlay)?;
            }
            self.write_group(item.artifact.as_ref(), &group, &params, &item.parameters.values, &mut report)?;
        }

        Ok(report)
    }

    fn write_group(
        &mut self,
        artifact: &dyn Artifact,
        group: &RenderGroup<'_>,
        params: &Params,
        announce_params: &Params,
        report: &mut BatchReport,
    ) -> Result<(), WriteError> {
        // First successfully encoded file and its uid
        let mut saved: Option<(PathBuf, String)> = None;

        for spec in &group.outputs {
            let dir = output_dir(spec, params)?;
            let path = output_path(spec, params)?;

            let placed = match &saved {
                None => {
                    let options = save_options(&group.key, spec, &path);
                    debug!(path = %path.display(), "Saving");
                    encode_into(&path, self.mode, |temp| artifact.save(temp, &options))
                }
                Some((first, _)) => link_or_copy(first, &path, self.link_retries),
            };
            match placed {
                Ok(placement) => {
                    info!(artifact = %artifact.describe(), path = %path.display(), ?placement, "Placed file");
                }
                Err(e) => {
                    error!(artifact = %artifact.describe(), path = %path.display(), error = %e, "Abandoning output");
                    report.failed.push(path);
                    continue;
                }
            }
            if saved.is_none() {
                let uid = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                saved = Some((path.clone(), uid));
            }

            self.thumbnail(spec, dir, &path, params);

            let uid = saved.as_ref().map(|(_, uid)| uid.as_str()).unwrap_or_default();
            self.announce(artifact, &path, uid, announce_params);
            report.placed.push(path);
        }
        Ok(())
    }

    fn thumbnail(&self, spec: &OutputSpec, output_dir: &str, path: &Path, params: &Params) {
        let (Some(name), Some(raw_size)) = (spec.attrs.get("thumbnail_name"), spec.attrs.get("thumbnail_size"))
        else {
            return;
        };
        let Some(size) = parse_thumbnail_size(raw_size) else {
            warn!(size = raw_size, "Invalid thumbnail size, expected WIDTHxHEIGHT");
            return;
        };
        let result = compose(&Path::new(output_dir).join(name).to_string_lossy(), params)
            .map_err(|e| e.to_string())
            .and_then(|thumb| {
                write_thumbnail(path, Path::new(&thumb), size)
                    .map(|()| thumb)
                    .map_err(|e| e.to_string())
            });
        match result {
            Ok(thumb) => debug!(thumbnail = %thumb, "Wrote thumbnail"),
            Err(e) => warn!(path = %path.display(), error = %e, "Thumbnail failed"),
        }
    }

    fn announce(&mut self, artifact: &dyn Artifact, path: &Path, uid: &str, params: &Params) {
        let announcement = match Announcement::for_file(artifact, path, uid, params, self.publish_topic.as_deref()) {
            Ok(a) => a,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot build announcement");
                return;
            }
        };
        debug!(subject = %announcement.subject, "Announcing");
        if let Err(e) = self.announcer.publish(announcement) {
            warn!(path = %path.display(), error = %e, "Announcement failed");
        }
    }
}

fn save_options(key: &Attributes, spec: &OutputSpec, path: &Path) -> SaveOptions {
    let format = key
        .get("format")
        .map(str::to_string)
        .or_else(|| path.extension().map(|e| e.to_string_lossy().to_string()));
    let compression = match spec.attrs.get_parsed::<u8>("compression") {
        Ok(level) => level.unwrap_or(DEFAULT_COMPRESSION),
        Err(reason) => {
            warn!(file = %spec.filename, %reason, "Invalid compression, using default");
            DEFAULT_COMPRESSION
        }
    };
    SaveOptions {
        format,
        compression: compression.min(9),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Background thread draining a [`WriteQueue`].
///
/// Exactly one batch is written at a time. Every popped batch is marked done
/// on the queue, whether it succeeded, partly failed, was aborted or panicked.
pub struct ArtifactWriter {
    thread_handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl ArtifactWriter {
    /// Start the writer thread on `queue`.
    pub fn start(queue: Arc<WriteQueue>, announcer: Box<dyn Announcer>, options: WriterOptions) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let writer = BatchWriter::new(announcer, &options);
        let poll_interval = options.poll_interval;

        let thread_handle = thread::Builder::new()
            .name("artifact-writer".to_string())
            .spawn(move || {
                Self::run_loop(queue, writer, poll_interval, shutdown_clone);
            })
            .expect("Failed to spawn artifact writer thread");

        info!("Artifact writer started (poll: {:?})", poll_interval);

        Self {
            thread_handle: Some(thread_handle),
            shutdown,
        }
    }

    fn run_loop(
        queue: Arc<WriteQueue>,
        mut writer: BatchWriter,
        poll_interval: Duration,
        shutdown: Arc<AtomicBool>,
    ) {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                debug!("Artifact writer received shutdown signal");
                break;
            }
            let Some(mut item) = queue.pop_timeout(poll_interval) else {
                continue;
            };
            let done = TaskDone(&queue);

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| writer.process(&mut item)));
            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let files: Vec<&str> = item.outputs.iter().map(|o| o.filename.as_str()).collect();
                    error!(files = ?files, panic = panic_message(payload.as_ref()), "Batch writer panicked, batch dropped");
                    drop(item);
                    drop(done);
                    continue;
                }
            };
            match outcome {
                Ok(report) if report.failed.is_empty() => {
                    debug!(files = report.placed.len(), "Batch written");
                }
                Ok(report) => {
                    warn!(
                        artifact = %item.artifact.describe(),
                        placed = report.placed.len(),
                        failed = report.failed.len(),
                        "Batch partly written"
                    );
                }
                Err(e) => {
                    let files: Vec<&str> = item.outputs.iter().map(|o| o.filename.as_str()).collect();
                    error!(
                        artifact = %item.artifact.describe(),
                        files = ?files,
                        error = %e,
                        "Batch aborted"
                    );
                }
            }

            // Release the artifact before reporting the batch done
            drop(item);
            drop(done);
        }
        debug!("Artifact writer stopped");
    }

    /// Signal the writer to stop after its current wait or batch.
    ///
    /// Non-blocking. Call [`ArtifactWriter::join`] to wait for the thread.
    pub fn stop(&self) {
        info!("Stopping artifact writer");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!("Artifact writer thread panicked: {:?}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for ArtifactWriter {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announce::ChannelAnnouncer;
    use crate::artifact::{ArtifactError, ImageArtifact};
    use crate::template::Parameters;
    use image::RgbaImage;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc::{self, Receiver};
    use std::time::Instant;
    use tempfile::TempDir;

    /// Writes fixed bytes, failing the first `fail_first` saves.
    struct Counting {
        metadata: Params,
        saves: Arc<AtomicUsize>,
        fail_first: usize,
    }

    impl Counting {
        fn new(fail_first: usize) -> (Self, Arc<AtomicUsize>) {
            let saves = Arc::new(AtomicUsize::new(0));
            let mut metadata = Params::new();
            metadata.insert("product_name", "overview");
            (
                Self {
                    metadata,
                    saves: Arc::clone(&saves),
                    fail_first,
                },
                saves,
            )
        }
    }

    impl Artifact for Counting {
        fn describe(&self) -> String {
            "counting".into()
        }
        fn metadata(&self) -> &Params {
            &self.metadata
        }
        fn metadata_mut(&mut self) -> &mut Params {
            &mut self.metadata
        }
        fn save(&self, path: &Path, _options: &SaveOptions) -> Result<(), ArtifactError> {
            let n = self.saves.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(ArtifactError::Other("disk full".into()));
            }
            fs::write(path, b"rendered")?;
            Ok(())
        }
    }

    /// Panics on save.
    struct Exploding(Params);

    impl Artifact for Exploding {
        fn describe(&self) -> String {
            "exploding".into()
        }
        fn metadata(&self) -> &Params {
            &self.0
        }
        fn metadata_mut(&mut self) -> &mut Params {
            &mut self.0
        }
        fn save(&self, _path: &Path, _options: &SaveOptions) -> Result<(), ArtifactError> {
            panic!("encoder crashed");
        }
    }

    fn spec(filename: &str, attrs: &[(&str, &str)]) -> OutputSpec {
        let mut a = Attributes::new();
        for (k, v) in attrs {
            a.insert(*k, *v);
        }
        OutputSpec::new(filename, a)
    }

    fn parameters(output_dir: &Path) -> Parameters {
        let mut values = Params::new();
        values.insert("output_dir", output_dir.to_string_lossy().to_string());
        values.insert("platform_name", "NOAA-19");
        Parameters::new(values, Default::default())
    }

    fn batch_writer() -> (BatchWriter, Receiver<Announcement>) {
        let (tx, rx) = mpsc::channel();
        (
            BatchWriter::new(Box::new(ChannelAnnouncer::new(tx)), &WriterOptions::default()),
            rx,
        )
    }

    #[test]
    fn test_grouping_ignores_placement_attributes() {
        let outputs = vec![
            spec("a.png", &[("output_dir", "/x")]),
            spec("b.tif", &[]),
            spec("c.png", &[("output_dir", "/y"), ("thumbnail_name", "t.png")]),
            spec("d.png", &[("overlay", "#ff0000")]),
        ];
        let groups = group_outputs(&outputs);

        let files: Vec<Vec<&str>> = groups
            .iter()
            .map(|g| g.outputs.iter().map(|o| o.filename.as_str()).collect())
            .collect();
        assert_eq!(files, vec![vec!["a.png", "c.png"], vec!["b.tif"], vec!["d.png"]]);
        assert_eq!(groups[0].key.get("format"), Some("png"));
    }

    #[test]
    fn test_explicit_format_groups_with_extension() {
        let outputs = vec![spec("a.png", &[]), spec("b.img", &[("format", "png")])];
        assert_eq!(group_outputs(&outputs).len(), 1);
    }

    #[test]
    fn test_one_encode_then_links() {
        let temp = TempDir::new().unwrap();
        let second = temp.path().join("second");
        let second = second.to_str().unwrap();
        let (artifact, saves) = Counting::new(0);
        let mut item = WorkItem {
            artifact: Box::new(artifact),
            outputs: vec![
                spec("{platform_name}_a.png", &[]),
                spec("b.png", &[("output_dir", second)]),
                spec("c.png", &[]),
            ],
            parameters: parameters(temp.path()),
        };
        let (mut writer, rx) = batch_writer();

        let report = writer.process(&mut item).unwrap();

        assert_eq!(saves.load(Ordering::SeqCst), 1);
        assert_eq!(report.placed.len(), 3);
        assert!(report.failed.is_empty());
        assert_eq!(report.placed[0], temp.path().join("NOAA-19_a.png"));
        for path in &report.placed {
            assert_eq!(fs::read(path).unwrap(), b"rendered");
        }

        let announcements: Vec<Announcement> = rx.try_iter().collect();
        assert_eq!(announcements.len(), 3);
        let uris: Vec<&str> = announcements.iter().filter_map(|a| a.uri()).collect();
        assert_eq!(uris.len(), 3);
        assert_ne!(uris[0], uris[1]);
        assert!(announcements.iter().all(|a| a.uid() == Some("NOAA-19_a.png")));
    }

    #[test]
    fn test_failed_encode_abandons_only_that_output() {
        let temp = TempDir::new().unwrap();
        let (artifact, saves) = Counting::new(2);
        let mut item = WorkItem {
            artifact: Box::new(artifact),
            outputs: vec![spec("first.png", &[]), spec("second.png", &[]), spec("third.png", &[])],
            parameters: parameters(temp.path()),
        };
        let (mut writer, rx) = batch_writer();

        let report = writer.process(&mut item).unwrap();

        // Two attempts for the first output, one for the second
        assert_eq!(saves.load(Ordering::SeqCst), 3);
        assert_eq!(report.failed, vec![temp.path().join("first.png")]);
        assert_eq!(
            report.placed,
            vec![temp.path().join("second.png"), temp.path().join("third.png")]
        );
        assert!(!temp.path().join("first.png").exists());
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_distinct_renderings_encode_separately() {
        let temp = TempDir::new().unwrap();
        let (artifact, saves) = Counting::new(0);
        let mut item = WorkItem {
            artifact: Box::new(artifact),
            outputs: vec![spec("a.png", &[]), spec("a.tif", &[])],
            parameters: parameters(temp.path()),
        };
        let (mut writer, _rx) = batch_writer();

        writer.process(&mut item).unwrap();
        assert_eq!(saves.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_output_dir_aborts_batch() {
        let (artifact, _) = Counting::new(0);
        let mut item = WorkItem {
            artifact: Box::new(artifact),
            outputs: vec![spec("a.png", &[])],
            parameters: Parameters::default(),
        };
        let (mut writer, _rx) = batch_writer();
        assert!(matches!(writer.process(&mut item), Err(WriteError::NoOutputDir(_))));
    }

    #[test]
    fn test_unknown_template_key_aborts_batch() {
        let temp = TempDir::new().unwrap();
        let (artifact, _) = Counting::new(0);
        let mut item = WorkItem {
            artifact: Box::new(artifact),
            outputs: vec![spec("{orbit}.png", &[])],
            parameters: parameters(temp.path()),
        };
        let (mut writer, _rx) = batch_writer();
        assert!(matches!(writer.process(&mut item), Err(WriteError::Template(_))));
    }

    #[test]
    fn test_overlay_on_unsupported_artifact_aborts_batch() {
        let temp = TempDir::new().unwrap();
        let (artifact, saves) = Counting::new(0);
        let mut item = WorkItem {
            artifact: Box::new(artifact),
            outputs: vec![spec("a.png", &[("overlay", "#00ff00")])],
            parameters: parameters(temp.path()),
        };
        let (mut writer, _rx) = batch_writer();
        assert!(matches!(writer.process(&mut item), Err(WriteError::Overlay(_))));
        assert_eq!(saves.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_aliases_apply_to_filenames() {
        let temp = TempDir::new().unwrap();
        let (artifact, _) = Counting::new(0);
        let mut parameters = parameters(temp.path());
        parameters.aliases.insert(
            "platform_name".to_string(),
            [("NOAA-19".to_string(), "noaa19".to_string())].into_iter().collect(),
        );
        let mut item = WorkItem {
            artifact: Box::new(artifact),
            outputs: vec![spec("{platform_name}.png", &[])],
            parameters,
        };
        let (mut writer, _rx) = batch_writer();

        let report = writer.process(&mut item).unwrap();
        assert_eq!(report.placed, vec![temp.path().join("noaa19.png")]);
    }

    #[test]
    fn test_thumbnail_written_next_to_output() {
        let temp = TempDir::new().unwrap();
        let mut item = WorkItem {
            artifact: Box::new(ImageArtifact::new(RgbaImage::new(64, 32), Params::new())),
            outputs: vec![spec(
                "full.png",
                &[("thumbnail_name", "thumb_{platform_name}.png"), ("thumbnail_size", "16x16")],
            )],
            parameters: parameters(temp.path()),
        };
        let (mut writer, _rx) = batch_writer();

        writer.process(&mut item).unwrap();
        let thumb = image::open(temp.path().join("thumb_NOAA-19.png")).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (16, 8));
    }

    #[test]
    fn test_writer_thread_drains_queue() {
        let temp = TempDir::new().unwrap();
        let queue = Arc::new(WriteQueue::unbounded());
        let (tx, rx) = mpsc::channel();
        let options = WriterOptions {
            poll_interval: Duration::from_millis(20),
            ..Default::default()
        };
        let mut writer = ArtifactWriter::start(Arc::clone(&queue), Box::new(ChannelAnnouncer::new(tx)), options);
        assert!(writer.is_running());

        let (artifact, saves) = Counting::new(0);
        queue.write(Box::new(artifact), vec![spec("a.png", &[])], &parameters(temp.path()));
        queue.join();

        assert_eq!(saves.load(Ordering::SeqCst), 1);
        assert_eq!(rx.try_iter().count(), 1);

        writer.stop();
        writer.join();
        assert!(!writer.is_running());
    }

    #[test]
    fn test_aborted_batch_still_marked_done() {
        let queue = Arc::new(WriteQueue::unbounded());
        let (tx, _rx) = mpsc::channel();
        let options = WriterOptions {
            poll_interval: Duration::from_millis(20),
            ..Default::default()
        };
        let _writer = ArtifactWriter::start(Arc::clone(&queue), Box::new(ChannelAnnouncer::new(tx)), options);

        let (artifact, _) = Counting::new(0);
        queue.write(Box::new(artifact), vec![spec("a.png", &[])], &Parameters::default());
        queue.join();
        assert_eq!(queue.unfinished(), 0);
    }

    #[test]
    fn test_panicking_batch_does_not_stop_writer() {
        let temp = TempDir::new().unwrap();
        let queue = Arc::new(WriteQueue::unbounded());
        let (tx, rx) = mpsc::channel();
        let options = WriterOptions {
            poll_interval: Duration::from_millis(20),
            ..Default::default()
        };
        let mut writer = ArtifactWriter::start(Arc::clone(&queue), Box::new(ChannelAnnouncer::new(tx)), options);

        queue.write(Box::new(Exploding(Params::new())), vec![spec("boom.png", &[])], &parameters(temp.path()));
        let (artifact, saves) = Counting::new(0);
        queue.write(Box::new(artifact), vec![spec("fine.png", &[])], &parameters(temp.path()));
        queue.join();

        assert_eq!(queue.unfinished(), 0);
        assert_eq!(saves.load(Ordering::SeqCst), 1);
        let announcements: Vec<Announcement> = rx.try_iter().collect();
        assert_eq!(announcements.len(), 1);
        assert_eq!(announcements[0].uid(), Some("fine.png"));
        assert!(writer.is_running());

        writer.stop();
        writer.join();
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_stop_is_prompt_when_idle() {
        let queue = Arc::new(WriteQueue::unbounded());
        let (tx, _rx) = mpsc::channel();
        let options = WriterOptions {
            poll_interval: Duration::from_millis(50),
            ..Default::default()
        };
        let mut writer = ArtifactWriter::start(queue, Box::new(ChannelAnnouncer::new(tx)), options);

        let start = Instant::now();
        writer.stop();
        writer.join();
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
