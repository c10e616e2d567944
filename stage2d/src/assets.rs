use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use image::RgbaImage;

use crate::error::AssetError;
use crate::math::Vec2;

/// Lifecycle of an image load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageStatus {
    Initiating,
    Loading,
    Loaded,
    Failed,
}

struct SlotState {
    status: ImageStatus,
    progress: f32,
    image: Option<Rc<RgbaImage>>,
    error: Option<String>,
}

struct ImageSlot {
    source: String,
    state: RefCell<SlotState>,
}

/// Shared handle to an image that may still be loading.
///
/// Clones refer to the same slot, so an entity bound to a handle starts drawing as soon as
/// [`Resources::poll`] resolves it. Until then the handle behaves like "no image".
#[derive(Clone)]
pub struct ImageHandle {
    slot: Rc<ImageSlot>,
}

impl ImageHandle {
    /// A handle that has not started loading yet.
    pub fn pending(source: impl Into<String>) -> Self {
        Self {
            slot: Rc::new(ImageSlot {
                source: source.into(),
                state: RefCell::new(SlotState {
                    status: ImageStatus::Initiating,
                    progress: 0.0,
                    image: None,
                    error: None,
                }),
            }),
        }
    }

    /// A handle that is already resolved to `image`.
    pub fn from_image(source: impl Into<String>, image: RgbaImage) -> Self {
        let handle = Self::pending(source);
        handle.resolve(image);
        handle
    }

    pub fn source(&self) -> &str {
        &self.slot.source
    }

    pub fn status(&self) -> ImageStatus {
        self.slot.state.borrow().status
    }

    pub fn progress(&self) -> f32 {
        self.slot.state.borrow().progress
    }

    pub fn is_loaded(&self) -> bool {
        self.status() == ImageStatus::Loaded
    }

    /// True once the load either succeeded or failed.
    pub fn is_settled(&self) -> bool {
        matches!(self.status(), ImageStatus::Loaded | ImageStatus::Failed)
    }

    /// Pixel size once loaded.
    pub fn size(&self) -> Option<Vec2> {
        self.slot
            .state
            .borrow()
            .image
            .as_ref()
            .map(|image| Vec2::new(image.width() as f32, image.height() as f32))
    }

    pub fn image(&self) -> Option<Rc<RgbaImage>> {
        self.slot.state.borrow().image.clone()
    }

    /// Failure message once the load failed.
    pub fn error(&self) -> Option<String> {
        self.slot.state.borrow().error.clone()
    }

    fn set_status(&self, status: ImageStatus) {
        self.slot.state.borrow_mut().status = status;
    }

    fn set_progress(&self, progress: f32) {
        self.slot.state.borrow_mut().progress = progress.clamp(0.0, 1.0);
    }

    fn resolve(&self, image: RgbaImage) {
        let mut state = self.slot.state.borrow_mut();
        state.image = Some(Rc::new(image));
        state.status = ImageStatus::Loaded;
        state.progress = 1.0;
        state.error = None;
    }

    fn fail(&self, error: &AssetError) {
        let mut state = self.slot.state.borrow_mut();
        state.status = ImageStatus::Failed;
        state.error = Some(error.to_string());
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("source", &self.slot.source)
            .field("status", &self.status())
            .field("size", &self.size())
            .finish()
    }
}

enum LoadMessage {
    Started(u64),
    Progress(u64, f32),
    Finished(u64, Result<RgbaImage, AssetError>),
}

struct Job {
    handle: ImageHandle,
    thread: JoinHandle<()>,
}

type StatusObserver = Box<dyn FnMut(&ImageHandle, ImageStatus)>;
type ProgressObserver = Box<dyn FnMut(&ImageHandle, f32)>;

/// Loads and caches images by alias.
///
/// Files are read and decoded on worker threads. Results travel back over a channel and are
/// applied to their handles by [`Resources::poll`], which the host calls once per frame, so
/// handles are only ever touched from the frame thread.
pub struct Resources {
    cache: HashMap<String, ImageHandle>,
    jobs: HashMap<u64, Job>,
    next_job: u64,
    sender: Sender<LoadMessage>,
    receiver: Receiver<LoadMessage>,
    status_observers: Vec<StatusObserver>,
    progress_observers: Vec<ProgressObserver>,
}

impl Resources {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            cache: HashMap::new(),
            jobs: HashMap::new(),
            next_job: 0,
            sender,
            receiver,
            status_observers: Vec::new(),
            progress_observers: Vec::new(),
        }
    }

    /// Call `observer` whenever a handle created by this loader changes status.
    pub fn on_status_changed<F>(&mut self, observer: F)
    where
        F: FnMut(&ImageHandle, ImageStatus) + 'static,
    {
        self.status_observers.push(Box::new(observer));
    }

    /// Call `observer` whenever a handle created by this loader reports progress.
    pub fn on_progress<F>(&mut self, observer: F)
    where
        F: FnMut(&ImageHandle, f32) + 'static,
    {
        self.progress_observers.push(Box::new(observer));
    }

    /// Start loading an image file in the background.
    ///
    /// The handle is cached under `alias`, or under the path itself when no alias is given.
    /// Reusing an alias replaces the cached handle.
    pub fn add_image(&mut self, source: impl AsRef<Path>, alias: Option<&str>) -> ImageHandle {
        let path = source.as_ref().to_path_buf();
        let name = path.to_string_lossy().into_owned();
        let handle = ImageHandle::pending(name.clone());

        if name.is_empty() {
            let error = AssetError::EmptySource;
            log::error!("Resources::add_image: {error}");
            self.fail(&handle, &error);
            return handle;
        }

        self.cache_handle(alias.unwrap_or(&name), &handle);

        let job_id = self.next_job;
        self.next_job += 1;
        let sender = self.sender.clone();
        let spawned = thread::Builder::new()
            .name(format!("stage2d-image-{job_id}"))
            .spawn(move || load_file(job_id, path, &sender));

        match spawned {
            Ok(thread) => {
                self.jobs.insert(
                    job_id,
                    Job {
                        handle: handle.clone(),
                        thread,
                    },
                );
            }
            Err(source) => {
                let error = AssetError::Io {
                    path: PathBuf::from(&name),
                    source,
                };
                log::error!("Resources::add_image: could not start loader: {error}");
                self.fail(&handle, &error);
            }
        }

        handle
    }

    /// Start several loads at once. Handles come back in input order.
    pub fn add_images<'a, I, P>(&mut self, sources: I) -> Vec<ImageHandle>
    where
        I: IntoIterator<Item = (P, Option<&'a str>)>,
        P: AsRef<Path>,
    {
        sources
            .into_iter()
            .map(|(source, alias)| self.add_image(source, alias))
            .collect()
    }

    /// Decode an encoded image synchronously and cache it under `alias`.
    pub fn load_from_bytes(&mut self, alias: &str, bytes: &[u8]) -> Result<ImageHandle, AssetError> {
        let image = decode(alias, bytes)?;
        Ok(self.insert_rgba(alias, image))
    }

    /// Cache already-decoded pixels under `alias`.
    pub fn insert_rgba(&mut self, alias: &str, image: RgbaImage) -> ImageHandle {
        let handle = ImageHandle::from_image(alias, image);
        self.cache_handle(alias, &handle);
        handle
    }

    /// Cached handle for `alias`.
    pub fn try_get_image(&self, alias: &str) -> Result<ImageHandle, AssetError> {
        self.cache
            .get(alias)
            .cloned()
            .ok_or_else(|| AssetError::UnknownAlias(alias.to_string()))
    }

    /// Cached handle for `alias`, logging when there is none.
    pub fn get_image(&self, alias: &str) -> Option<ImageHandle> {
        match self.try_get_image(alias) {
            Ok(handle) => Some(handle),
            Err(error) => {
                log::error!("Resources::get_image: {error}");
                None
            }
        }
    }

    /// Number of loads that have not reported a result yet.
    pub fn pending(&self) -> usize {
        self.jobs.len()
    }

    /// Apply everything the loader threads reported since the last call.
    ///
    /// Returns how many loads settled (loaded or failed) during this call.
    pub fn poll(&mut self) -> usize {
        // Threads that already exited have queued all of their messages.
        let exited: Vec<u64> = self
            .jobs
            .iter()
            .filter(|(_, job)| job.thread.is_finished())
            .map(|(&id, _)| id)
            .collect();

        let mut settled = 0;
        while let Ok(message) = self.receiver.try_recv() {
            match message {
                LoadMessage::Started(id) => {
                    if let Some(handle) = self.job_handle(id) {
                        self.change_status(&handle, ImageStatus::Loading);
                    }
                }
                LoadMessage::Progress(id, progress) => {
                    if let Some(handle) = self.job_handle(id) {
                        self.change_progress(&handle, progress);
                    }
                }
                LoadMessage::Finished(id, result) => {
                    let Some(job) = self.jobs.remove(&id) else {
                        continue;
                    };
                    settled += 1;
                    match result {
                        Ok(image) => {
                            log::debug!("loaded image {}", job.handle.source());
                            job.handle.resolve(image);
                            self.notify_status(&job.handle, ImageStatus::Loaded);
                            self.notify_progress(&job.handle, 1.0);
                        }
                        Err(error) => {
                            log::warn!("failed to load image {}: {error}", job.handle.source());
                            self.fail(&job.handle, &error);
                        }
                    }
                }
            }
        }

        for id in exited {
            if let Some(job) = self.jobs.remove(&id) {
                settled += 1;
                let error = AssetError::LoaderGone(job.handle.source().to_string());
                log::warn!("{error}");
                self.fail(&job.handle, &error);
            }
        }

        settled
    }

    fn job_handle(&self, id: u64) -> Option<ImageHandle> {
        self.jobs.get(&id).map(|job| job.handle.clone())
    }

    fn cache_handle(&mut self, alias: &str, handle: &ImageHandle) {
        if self.cache.insert(alias.to_string(), handle.clone()).is_some() {
            log::warn!("image alias \"{alias}\" is already in use and will be overwritten");
        }
    }

    fn fail(&mut self, handle: &ImageHandle, error: &AssetError) {
        handle.fail(error);
        self.notify_status(handle, ImageStatus::Failed);
    }

    fn change_status(&mut self, handle: &ImageHandle, status: ImageStatus) {
        handle.set_status(status);
        self.notify_status(handle, status);
    }

    fn change_progress(&mut self, handle: &ImageHandle, progress: f32) {
        handle.set_progress(progress);
        self.notify_progress(handle, handle.progress());
    }

    fn notify_status(&mut self, handle: &ImageHandle, status: ImageStatus) {
        for observer in &mut self.status_observers {
            observer(handle, status);
        }
    }

    fn notify_progress(&mut self, handle: &ImageHandle, progress: f32) {
        for observer in &mut self.progress_observers {
            observer(handle, progress);
        }
    }
}

impl Default for Resources {
    fn default() -> Self {
        Self::new()
    }
}

/// True when every handle has either loaded or failed.
pub fn all_settled<'a>(handles: impl IntoIterator<Item = &'a ImageHandle>) -> bool {
    handles.into_iter().all(ImageHandle::is_settled)
}

fn load_file(job_id: u64, path: PathBuf, sender: &Sender<LoadMessage>) {
    // A closed channel means the loader was dropped; nobody is left to tell.
    let _ = sender.send(LoadMessage::Started(job_id));

    let result = std::fs::read(&path)
        .map_err(|source| AssetError::Io {
            path: path.clone(),
            source,
        })
        .and_then(|bytes| {
            let _ = sender.send(LoadMessage::Progress(job_id, 0.5));
            decode(&path.to_string_lossy(), &bytes)
        });

    let _ = sender.send(LoadMessage::Finished(job_id, result));
}

fn decode(name: &str, bytes: &[u8]) -> Result<RgbaImage, AssetError> {
    image::load_from_memory(bytes)
        .map(|image| image.to_rgba8())
        .map_err(|source| AssetError::Decode {
            name: name.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn poll_until_settled(resources: &mut Resources, handle: &ImageHandle) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !handle.is_settled() && Instant::now() < deadline {
            resources.poll();
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, image::ImageOutputFormat::Png)
            .expect("encode png");
        bytes.into_inner()
    }

    #[test]
    fn pending_handle_has_no_size() {
        let handle = ImageHandle::pending("grass.png");
        assert_eq!(handle.status(), ImageStatus::Initiating);
        assert_eq!(handle.size(), None);
        assert!(!handle.is_loaded());
    }

    #[test]
    fn insert_rgba_resolves_immediately() {
        let mut resources = Resources::new();
        let handle = resources.insert_rgba("tree", RgbaImage::new(8, 4));
        assert!(handle.is_loaded());
        assert_eq!(handle.progress(), 1.0);
        assert_eq!(handle.size(), Some(Vec2::new(8.0, 4.0)));
        assert_eq!(resources.get_image("tree"), Some(handle));
    }

    #[test]
    fn load_from_bytes_decodes_png() {
        let mut resources = Resources::new();
        let handle = resources
            .load_from_bytes("tile", &png_bytes(3, 5))
            .expect("decode");
        assert_eq!(handle.size(), Some(Vec2::new(3.0, 5.0)));
    }

    #[test]
    fn load_from_bytes_rejects_garbage() {
        let mut resources = Resources::new();
        let result = resources.load_from_bytes("broken", b"not an image");
        assert!(matches!(result, Err(AssetError::Decode { .. })));
        assert!(resources.get_image("broken").is_none());
    }

    #[test]
    fn reusing_alias_overwrites_cache() {
        let mut resources = Resources::new();
        let first = resources.insert_rgba("hero", RgbaImage::new(1, 1));
        let second = resources.insert_rgba("hero", RgbaImage::new(2, 2));
        let cached = resources.get_image("hero").expect("cached");
        assert_eq!(cached, second);
        assert_ne!(cached, first);
    }

    #[test]
    fn unknown_alias_is_an_error() {
        let resources = Resources::new();
        assert!(matches!(
            resources.try_get_image("missing"),
            Err(AssetError::UnknownAlias(alias)) if alias == "missing"
        ));
        assert_eq!(resources.get_image("missing"), None);
    }

    #[test]
    fn background_load_reports_status_transitions() {
        let path = std::env::temp_dir().join(format!("stage2d-load-{}.png", std::process::id()));
        std::fs::write(&path, png_bytes(6, 2)).expect("write temp png");

        let mut resources = Resources::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        resources.on_status_changed(move |_, status| sink.borrow_mut().push(status));

        let handle = resources.add_image(&path, Some("sample"));
        assert_eq!(handle.status(), ImageStatus::Initiating);
        poll_until_settled(&mut resources, &handle);

        assert!(handle.is_loaded());
        assert_eq!(handle.size(), Some(Vec2::new(6.0, 2.0)));
        assert_eq!(resources.pending(), 0);
        assert_eq!(
            *seen.borrow(),
            vec![ImageStatus::Loading, ImageStatus::Loaded]
        );
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_fails_the_handle() {
        let mut resources = Resources::new();
        let handle = resources.add_image("/definitely/not/here.png", None);
        poll_until_settled(&mut resources, &handle);

        assert_eq!(handle.status(), ImageStatus::Failed);
        assert!(handle.error().is_some());
        assert_eq!(handle.size(), None);
        assert!(all_settled([&handle]));
        // Path doubles as the alias.
        assert!(resources.get_image("/definitely/not/here.png").is_some());
    }

    #[test]
    fn empty_source_fails_without_loading() {
        let mut resources = Resources::new();
        let handle = resources.add_image("", None);
        assert_eq!(handle.status(), ImageStatus::Failed);
        assert_eq!(resources.pending(), 0);
    }
}
