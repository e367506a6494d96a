//! Mock runtime and host for capture tests.
//!
//! Every object the mock runtime creates is recorded in a [`Ledger`]: a weak
//! reference to check for leaks, and a drop log to check release order.
//! [`MockRuntime::fail_at`] injects a failure at one construction step.

#![allow(dead_code)]

use kiln_core::hal::{
    Allocator, Device, Driver, DriverFactory, DriverRegistry, ExecutableLoader, ExecutionMode,
    HalResult, HalRuntime, QueueSet, Status, StatusCode, SyncDeviceParams, VmInstance, VmModule,
    VulkanDeviceOptions, VulkanHandles, VulkanSyms, MAX_DRIVER_FACTORIES,
};
use kiln_core::rendering::{DriverResource, RenderingApi, RenderingDevice, RenderingServer, Rid};
use kiln_core::DeviceConfig;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::{Arc, Weak};

/// Construction steps a failure can be injected at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Loader,
    Allocator,
    SyncDevice,
    Module,
    Driver,
    DefaultDevice,
    Syms,
    Wrap,
}

pub const CPU_STEPS: [Step; 4] = [Step::Loader, Step::Allocator, Step::SyncDevice, Step::Module];
pub const DRIVER_STEPS: [Step; 3] = [Step::Driver, Step::DefaultDevice, Step::Module];
pub const WRAP_STEPS: [Step; 3] = [Step::Syms, Step::Wrap, Step::Module];

/// Install a test subscriber once so failure logs show up with `--nocapture`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Run `f` with a subscriber that writes into a buffer, returning its output.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let value = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock()).into_owned();
    (value, logs)
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct Ledger {
    created: Mutex<Vec<(String, Weak<dyn Any + Send + Sync>)>>,
    dropped: Mutex<Vec<String>>,
    calls: Mutex<Vec<&'static str>>,
    modes: Mutex<Vec<ExecutionMode>>,
    /// Creations and drops interleaved, as `"+label"` / `"-label"`.
    events: Mutex<Vec<String>>,
    next_id: Mutex<usize>,
}

impl Ledger {
    /// Labels of created objects that are still alive.
    pub fn live(&self) -> Vec<String> {
        self.created
            .lock()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .map(|(label, _)| label.clone())
            .collect()
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().iter().map(|(l, _)| l.clone()).collect()
    }

    pub fn dropped(&self) -> Vec<String> {
        self.dropped.lock().clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Execution mode of every module the runtime was asked to build.
    pub fn modes(&self) -> Vec<ExecutionMode> {
        self.modes.lock().clone()
    }

    pub fn clear_logs(&self) {
        self.dropped.lock().clear();
        self.calls.lock().clear();
        self.events.lock().clear();
    }

    fn call(&self, name: &'static str) {
        self.calls.lock().push(name);
    }

    fn next_label(&self, kind: &str) -> String {
        let mut id = self.next_id.lock();
        *id += 1;
        format!("{}#{}", kind, *id)
    }

    fn track(&self, label: &str, object: Weak<dyn Any + Send + Sync>) {
        self.events.lock().push(format!("+{}", label));
        self.created.lock().push((label.to_string(), object));
    }

    fn untrack(&self, label: &str) {
        self.events.lock().push(format!("-{}", label));
        self.dropped.lock().push(label.to_string());
    }
}

#[derive(Debug)]
pub enum Held {
    Instance(Arc<dyn VmInstance>),
    Loader(Arc<dyn ExecutableLoader>),
    Allocator(Arc<dyn Allocator>),
    Device(Arc<dyn Device>),
    Syms(Arc<dyn VulkanSyms>),
}

/// One mock resource. It implements every resource trait; the runtime hands
/// it out under whichever one was asked for.
pub struct MockObject {
    pub label: String,
    pub held: Vec<Held>,
    ledger: Arc<Ledger>,
}

impl MockObject {
    fn create(ledger: &Arc<Ledger>, kind: &str, held: Vec<Held>) -> Arc<Self> {
        let label = ledger.next_label(kind);
        let object = Arc::new(Self {
            label: label.clone(),
            held,
            ledger: Arc::clone(ledger),
        });
        let weak: Weak<dyn Any + Send + Sync> = Arc::<MockObject>::downgrade(&object);
        ledger.track(&label, weak);
        object
    }

    pub fn kind(&self) -> &str {
        self.label.split('#').next().unwrap_or_default()
    }
}

impl std::fmt::Debug for MockObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockObject").field("label", &self.label).finish()
    }
}

impl Drop for MockObject {
    fn drop(&mut self) {
        self.ledger.untrack(&self.label);
    }
}

impl VmInstance for MockObject {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ExecutableLoader for MockObject {
    fn format(&self) -> &str {
        "vmvx"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Allocator for MockObject {
    fn identifier(&self) -> &str {
        &self.label
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Device for MockObject {
    fn identifier(&self) -> &str {
        &self.label
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl VmModule for MockObject {
    fn name(&self) -> &str {
        "hal"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl VulkanSyms for MockObject {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Arguments the runtime saw on its last wrap call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapCall {
    pub identifier: String,
    pub options: VulkanDeviceOptions,
    pub handles: VulkanHandles,
    pub compute_queue_set: QueueSet,
    pub transfer_queue_set: QueueSet,
}

struct Shared {
    ledger: Arc<Ledger>,
    fail_at: Mutex<Option<Step>>,
    last_wrap: Mutex<Option<WrapCall>>,
}

impl Shared {
    fn check(&self, step: Step) -> HalResult<()> {
        if *self.fail_at.lock() == Some(step) {
            Err(Status::new(
                StatusCode::ResourceExhausted,
                format!("injected failure at {:?}", step),
            ))
        } else {
            Ok(())
        }
    }
}

pub struct MockRuntime {
    config: DeviceConfig,
    registry: DriverRegistry,
    shared: Arc<Shared>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new(DeviceConfig::default())
    }
}

impl MockRuntime {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            config,
            registry: DriverRegistry::new(),
            shared: Arc::new(Shared {
                ledger: Arc::new(Ledger::default()),
                fail_at: Mutex::new(None),
                last_wrap: Mutex::new(None),
            }),
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.shared.ledger
    }

    pub fn fail_at(&self, step: Option<Step>) {
        *self.shared.fail_at.lock() = step;
    }

    pub fn last_wrap(&self) -> Option<WrapCall> {
        self.shared.last_wrap.lock().clone()
    }

    pub fn instance(&self) -> Arc<dyn VmInstance> {
        MockObject::create(self.ledger(), "instance", vec![])
    }

    /// Fill the registry with unrelated drivers so registering the GPU
    /// driver fails.
    pub fn exhaust_registry(&self) {
        for i in 0..MAX_DRIVER_FACTORIES {
            self.registry
                .register(Arc::new(FillerFactory(format!("filler{}", i))))
                .unwrap();
        }
    }
}

impl HalRuntime for MockRuntime {
    fn config(&self) -> &DeviceConfig {
        &self.config
    }

    fn create_vmvx_loader(
        &self,
        instance: &Arc<dyn VmInstance>,
        user_modules: &[Arc<dyn VmModule>],
    ) -> HalResult<Arc<dyn ExecutableLoader>> {
        let shared = &self.shared;
        shared.ledger.call("loader");
        assert!(user_modules.is_empty());
        shared.check(Step::Loader)?;
        Ok(MockObject::create(
            &shared.ledger,
            "loader",
            vec![Held::Instance(Arc::clone(instance))],
        ))
    }

    fn create_heap_allocator(&self, identifier: &str) -> HalResult<Arc<dyn Allocator>> {
        let shared = &self.shared;
        shared.ledger.call("allocator");
        assert_eq!(identifier, self.config.cpu_identifier);
        shared.check(Step::Allocator)?;
        Ok(MockObject::create(&shared.ledger, "allocator", vec![]))
    }

    fn create_sync_device(
        &self,
        params: &SyncDeviceParams,
        loaders: &[Arc<dyn ExecutableLoader>],
        allocator: &Arc<dyn Allocator>,
    ) -> HalResult<Arc<dyn Device>> {
        let shared = &self.shared;
        shared.ledger.call("sync_device");
        assert_eq!(params.identifier, self.config.cpu_identifier);
        assert_eq!(loaders.len(), 1);
        shared.check(Step::SyncDevice)?;
        let mut held: Vec<Held> = loaders.iter().cloned().map(Held::Loader).collect();
        held.push(Held::Allocator(Arc::clone(allocator)));
        Ok(MockObject::create(&shared.ledger, "device", held))
    }

    fn create_hal_module(
        &self,
        instance: &Arc<dyn VmInstance>,
        device: &Arc<dyn Device>,
        mode: ExecutionMode,
    ) -> HalResult<Arc<dyn VmModule>> {
        let shared = &self.shared;
        shared.ledger.call("module");
        shared.ledger.modes.lock().push(mode);
        shared.check(Step::Module)?;
        Ok(MockObject::create(
            &shared.ledger,
            "module",
            vec![
                Held::Instance(Arc::clone(instance)),
                Held::Device(Arc::clone(device)),
            ],
        ))
    }

    fn driver_registry(&self) -> &DriverRegistry {
        &self.registry
    }

    fn gpu_driver_factory(&self) -> Arc<dyn DriverFactory> {
        self.shared.ledger.call("register");
        Arc::new(MockDriverFactory {
            name: self.config.gpu_identifier.clone(),
            shared: Arc::clone(&self.shared),
        })
    }

    fn create_vulkan_syms(&self) -> HalResult<Arc<dyn VulkanSyms>> {
        let shared = &self.shared;
        shared.ledger.call("syms");
        shared.check(Step::Syms)?;
        Ok(MockObject::create(&shared.ledger, "syms", vec![]))
    }

    fn wrap_vulkan_device(
        &self,
        identifier: &str,
        options: &VulkanDeviceOptions,
        syms: &Arc<dyn VulkanSyms>,
        handles: VulkanHandles,
        compute_queue_set: &QueueSet,
        transfer_queue_set: &QueueSet,
    ) -> HalResult<Arc<dyn Device>> {
        let shared = &self.shared;
        shared.ledger.call("wrap");
        *shared.last_wrap.lock() = Some(WrapCall {
            identifier: identifier.to_string(),
            options: *options,
            handles,
            compute_queue_set: *compute_queue_set,
            transfer_queue_set: *transfer_queue_set,
        });
        shared.check(Step::Wrap)?;
        Ok(MockObject::create(
            &shared.ledger,
            "device",
            vec![Held::Syms(Arc::clone(syms))],
        ))
    }
}

struct MockDriverFactory {
    name: String,
    shared: Arc<Shared>,
}

impl DriverFactory for MockDriverFactory {
    fn driver_name(&self) -> &str {
        &self.name
    }

    fn create_driver(&self) -> HalResult<Arc<dyn Driver>> {
        self.shared.ledger.call("driver");
        self.shared.check(Step::Driver)?;
        let label = self.shared.ledger.next_label("driver");
        let driver = Arc::new(MockDriver {
            label,
            shared: Arc::clone(&self.shared),
        });
        let weak: Weak<dyn Any + Send + Sync> = Arc::<MockDriver>::downgrade(&driver);
        self.shared.ledger.track(&driver.label, weak);
        Ok(driver)
    }
}

pub struct MockDriver {
    label: String,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDriver").field("label", &self.label).finish()
    }
}

impl Drop for MockDriver {
    fn drop(&mut self) {
        self.shared.ledger.untrack(&self.label);
    }
}

impl Driver for MockDriver {
    fn name(&self) -> &str {
        "vulkan"
    }

    fn create_default_device(&self) -> HalResult<Arc<dyn Device>> {
        self.shared.ledger.call("default_device");
        self.shared.check(Step::DefaultDevice)?;
        Ok(MockObject::create(&self.shared.ledger, "device", vec![]))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct FillerFactory(String);

impl DriverFactory for FillerFactory {
    fn driver_name(&self) -> &str {
        &self.0
    }

    fn create_driver(&self) -> HalResult<Arc<dyn Driver>> {
        Err(Status::unavailable("filler driver"))
    }
}

/// Host rendering device returning fixed driver values.
#[derive(Debug, Clone)]
pub struct MockRenderingDevice {
    pub api: RenderingApi,
    pub instance: u64,
    pub physical_device: u64,
    pub device: u64,
    pub queue_family_index: u64,
}

impl Default for MockRenderingDevice {
    fn default() -> Self {
        Self {
            api: RenderingApi::Vulkan,
            instance: 0x1000,
            physical_device: 0x2000,
            device: 0x3000,
            queue_family_index: 2,
        }
    }
}

impl RenderingDevice for MockRenderingDevice {
    fn driver_resource(&self, resource: DriverResource, _rid: Rid, _index: u64) -> u64 {
        match resource {
            DriverResource::VulkanInstance => self.instance,
            DriverResource::VulkanPhysicalDevice => self.physical_device,
            DriverResource::VulkanDevice => self.device,
            DriverResource::VulkanQueueFamilyIndex => self.queue_family_index,
        }
    }

    fn api(&self) -> RenderingApi {
        self.api
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockHost {
    pub device: Option<MockRenderingDevice>,
}

impl MockHost {
    pub fn vulkan() -> Self {
        Self {
            device: Some(MockRenderingDevice::default()),
        }
    }

    pub fn with_device(device: MockRenderingDevice) -> Self {
        Self {
            device: Some(device),
        }
    }
}

impl RenderingServer for MockHost {
    fn rendering_device(&self) -> Option<&dyn RenderingDevice> {
        self.device.as_ref().map(|d| d as &dyn RenderingDevice)
    }
}
