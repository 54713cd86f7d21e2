//! Recording fakes for the engine, renderer, remote provider and fetcher

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use impulse_core::{
    EngineEvent, EngineEventSink, EngineFactory, Error, HostId, HttpFetch, PlaybackCoordinator,
    PlaybackEngine, PlayerSettings, RemoteDevice, RemoteEvent, RemoteEventSink,
    RemoteSessionProvider, Renderer, FullScreenLayer, Result, SessionId, SurfaceTarget,
    TimeObserverToken, VideoRef,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub fn video(name: &str) -> VideoRef {
    VideoRef::new(Url::parse(&format!("https://cdn.example.com/{}.m3u8", name)).unwrap())
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Load(String),
    Play,
    Pause,
    Seek(f64),
    SetRate(f32),
    SetPeakBitrate(f64),
    AddTimeObserver(u64),
    RemoveTimeObserver(u64),
    Stop,
}

#[derive(Debug, Default)]
pub struct EngineProbe {
    pub calls: Vec<EngineCall>,
    pub sink: Option<EngineEventSink>,
    pub current_time: f64,
    pub duration: f64,
}

pub type Probe = Arc<Mutex<EngineProbe>>;

pub struct FakeEngine {
    probe: Probe,
    next_token: u64,
}

impl FakeEngine {
    fn record(&self, call: EngineCall) {
        self.probe.lock().unwrap().calls.push(call);
    }
}

impl PlaybackEngine for FakeEngine {
    fn load(&mut self, video: &VideoRef, events: EngineEventSink) {
        let mut probe = self.probe.lock().unwrap();
        probe.calls.push(EngineCall::Load(video.url().to_string()));
        probe.sink = Some(events);
    }

    fn play(&mut self) {
        self.record(EngineCall::Play);
    }

    fn pause(&mut self) {
        self.record(EngineCall::Pause);
    }

    fn seek(&mut self, seconds: f64) {
        let mut probe = self.probe.lock().unwrap();
        probe.calls.push(EngineCall::Seek(seconds));
        probe.current_time = seconds;
    }

    fn current_time(&self) -> f64 {
        self.probe.lock().unwrap().current_time
    }

    fn duration(&self) -> f64 {
        self.probe.lock().unwrap().duration
    }

    fn set_rate(&mut self, rate: f32) {
        self.record(EngineCall::SetRate(rate));
    }

    fn set_peak_bitrate(&mut self, bits_per_second: f64) {
        self.record(EngineCall::SetPeakBitrate(bits_per_second));
    }

    fn add_periodic_time_observer(&mut self, _interval: Duration) -> TimeObserverToken {
        self.next_token += 1;
        self.record(EngineCall::AddTimeObserver(self.next_token));
        TimeObserverToken(self.next_token)
    }

    fn remove_time_observer(&mut self, token: TimeObserverToken) {
        self.record(EngineCall::RemoveTimeObserver(token.0));
    }

    fn stop(&mut self) {
        self.record(EngineCall::Stop);
    }
}

/// Hands out fake engines and keeps a probe for each one created
#[derive(Clone, Default)]
pub struct EngineLab {
    probes: Arc<Mutex<Vec<Probe>>>,
    fail: Arc<AtomicBool>,
    duration: Arc<Mutex<f64>>,
}

impl EngineLab {
    pub fn new() -> Self {
        let lab = Self::default();
        lab.set_duration(120.0);
        lab
    }

    pub fn factory(&self) -> FakeEngineFactory {
        FakeEngineFactory { lab: self.clone() }
    }

    pub fn fail_construction(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_duration(&self, duration: f64) {
        *self.duration.lock().unwrap() = duration;
    }

    pub fn created(&self) -> usize {
        self.probes.lock().unwrap().len()
    }

    pub fn probe(&self, index: usize) -> Probe {
        Arc::clone(&self.probes.lock().unwrap()[index])
    }

    pub fn last(&self) -> Probe {
        let probes = self.probes.lock().unwrap();
        Arc::clone(probes.last().expect("no engine created"))
    }

    pub fn calls(&self, index: usize) -> Vec<EngineCall> {
        self.probe(index).lock().unwrap().calls.clone()
    }

    /// Emit through the sink engine `index` received on its latest load
    pub fn emit(&self, index: usize, event: EngineEvent) {
        let sink = self.probe(index).lock().unwrap().sink.clone();
        sink.expect("engine never loaded").emit(event);
    }

    pub fn sink(&self, index: usize) -> EngineEventSink {
        self.probe(index).lock().unwrap().sink.clone().expect("engine never loaded")
    }

    pub fn set_current_time(&self, index: usize, seconds: f64) {
        self.probe(index).lock().unwrap().current_time = seconds;
    }
}

pub struct FakeEngineFactory {
    lab: EngineLab,
}

impl EngineFactory for FakeEngineFactory {
    fn create(&mut self, _video: &VideoRef) -> Result<Box<dyn PlaybackEngine>> {
        if self.lab.fail.load(Ordering::SeqCst) {
            return Err(Error::EngineConstruction("decoder unavailable".into()));
        }
        let probe = Arc::new(Mutex::new(EngineProbe {
            duration: *self.lab.duration.lock().unwrap(),
            ..Default::default()
        }));
        self.lab.probes.lock().unwrap().push(Arc::clone(&probe));
        Ok(Box::new(FakeEngine {
            probe,
            next_token: 0,
        }))
    }
}

// =============================================================================
// Renderer
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Attach(SessionId, SurfaceTarget),
    Detach(SessionId, SurfaceTarget),
    EnterFullScreen(SessionId, HostId, FullScreenLayer),
    ExitFullScreen(SessionId, FullScreenLayer),
    Placeholder(SessionId, bool),
    StartPip(SessionId),
    StopPip(SessionId),
}

#[derive(Clone, Default)]
pub struct RenderLog {
    calls: Arc<Mutex<Vec<RenderCall>>>,
}

impl RenderLog {
    pub fn renderer(&self) -> RecordingRenderer {
        RecordingRenderer { log: self.clone() }
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn push(&self, call: RenderCall) {
        self.calls.lock().unwrap().push(call);
    }
}

pub struct RecordingRenderer {
    log: RenderLog,
}

impl Renderer for RecordingRenderer {
    fn attach_surface(&mut self, session: SessionId, target: SurfaceTarget) {
        self.log.push(RenderCall::Attach(session, target));
    }

    fn detach_surface(&mut self, session: SessionId, target: SurfaceTarget) {
        self.log.push(RenderCall::Detach(session, target));
    }

    fn enter_full_screen(&mut self, session: SessionId, host: HostId, layer: FullScreenLayer) {
        self.log.push(RenderCall::EnterFullScreen(session, host, layer));
    }

    fn exit_full_screen(&mut self, session: SessionId, layer: FullScreenLayer) {
        self.log.push(RenderCall::ExitFullScreen(session, layer));
    }

    fn show_pip_placeholder(&mut self, session: SessionId, visible: bool) {
        self.log.push(RenderCall::Placeholder(session, visible));
    }

    fn start_picture_in_picture(&mut self, session: SessionId) {
        self.log.push(RenderCall::StartPip(session));
    }

    fn stop_picture_in_picture(&mut self, session: SessionId) {
        self.log.push(RenderCall::StopPip(session));
    }
}

// =============================================================================
// Remote provider
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    StartSession(String),
    EndSession,
    LoadMedia {
        url: String,
        start_offset: f64,
        autoplay: bool,
    },
    Play,
    Pause,
    Seek(f64),
}

#[derive(Debug, Default)]
pub struct RemoteProbe {
    pub calls: Vec<RemoteCall>,
    pub sink: Option<RemoteEventSink>,
    pub connected: bool,
    pub content_url: Option<Url>,
}

#[derive(Clone, Default)]
pub struct RemoteLab {
    probe: Arc<Mutex<RemoteProbe>>,
}

impl RemoteLab {
    /// A provider with a receiver session already running
    pub fn connected() -> Self {
        let lab = Self::default();
        lab.probe.lock().unwrap().connected = true;
        lab
    }

    pub fn provider(&self) -> Box<dyn RemoteSessionProvider> {
        Box::new(FakeRemote {
            probe: Arc::clone(&self.probe),
        })
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.probe.lock().unwrap().calls.clone()
    }

    pub fn emit(&self, event: RemoteEvent) {
        let sink = self.probe.lock().unwrap().sink.clone();
        sink.expect("provider never attached").emit(event);
    }

    pub fn set_content_url(&self, url: Option<Url>) {
        self.probe.lock().unwrap().content_url = url;
    }
}

pub struct FakeRemote {
    probe: Arc<Mutex<RemoteProbe>>,
}

impl FakeRemote {
    fn record(&self, call: RemoteCall) {
        self.probe.lock().unwrap().calls.push(call);
    }
}

impl RemoteSessionProvider for FakeRemote {
    fn attach(&mut self, events: RemoteEventSink) {
        self.probe.lock().unwrap().sink = Some(events);
    }

    fn is_connected(&self) -> bool {
        self.probe.lock().unwrap().connected
    }

    fn start_session(&mut self, target: &RemoteDevice) {
        self.record(RemoteCall::StartSession(target.id.clone()));
    }

    fn end_session(&mut self) {
        let mut probe = self.probe.lock().unwrap();
        probe.calls.push(RemoteCall::EndSession);
        probe.connected = false;
    }

    fn load_media(&mut self, video: &VideoRef, start_offset: f64, autoplay: bool) {
        let mut probe = self.probe.lock().unwrap();
        probe.calls.push(RemoteCall::LoadMedia {
            url: video.url().to_string(),
            start_offset,
            autoplay,
        });
        probe.content_url = Some(video.url().clone());
    }

    fn play(&mut self) {
        self.record(RemoteCall::Play);
    }

    fn pause(&mut self) {
        self.record(RemoteCall::Pause);
    }

    fn seek(&mut self, seconds: f64) {
        self.record(RemoteCall::Seek(seconds));
    }

    fn content_url(&self) -> Option<Url> {
        self.probe.lock().unwrap().content_url.clone()
    }
}

// =============================================================================
// Manifest fetch
// =============================================================================

pub struct StaticFetch {
    body: Option<String>,
}

impl StaticFetch {
    pub fn serving(body: &str) -> Arc<dyn HttpFetch> {
        Arc::new(Self {
            body: Some(body.to_string()),
        })
    }

    pub fn failing() -> Arc<dyn HttpFetch> {
        Arc::new(Self { body: None })
    }
}

#[async_trait]
impl HttpFetch for StaticFetch {
    async fn fetch(&self, _url: &Url, _headers: &BTreeMap<String, String>) -> Result<Bytes> {
        match &self.body {
            Some(body) => Ok(Bytes::from(body.clone())),
            None => Err(Error::ManifestFetch("HTTP 404".into())),
        }
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub coordinator: PlaybackCoordinator,
    pub engines: EngineLab,
    pub render: RenderLog,
}

pub fn harness() -> Harness {
    harness_with(PlayerSettings {
        picture_in_picture_enabled: true,
        ..Default::default()
    })
}

pub fn harness_with(settings: PlayerSettings) -> Harness {
    let engines = EngineLab::new();
    let render = RenderLog::default();
    let coordinator = PlaybackCoordinator::builder(engines.factory(), render.renderer())
        .settings(settings)
        .build()
        .unwrap();
    Harness {
        coordinator,
        engines,
        render,
    }
}

pub fn target(host: u64, container: u64) -> SurfaceTarget {
    SurfaceTarget::new(host, container)
}

impl Harness {
    /// Acquire, embed and make engine `index` ready
    pub fn ready_inline(&mut self, name: &str, target: SurfaceTarget) -> SessionId {
        let session = self.coordinator.acquire(video(name));
        self.coordinator.embed_inline(session, target);
        let index = self.engines.created() - 1;
        self.engines.emit(index, EngineEvent::Ready);
        self.coordinator.process_pending();
        session
    }
}
