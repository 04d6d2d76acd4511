// THEORY:
// The digit classifier is an opaque, separately built module. Its calling
// convention is handle based: the caller allocates an input vector inside the
// module, pushes values into it one by one, asks for a prediction, reads the
// result by index, and must free every handle itself because the module never
// reclaims them. This file wraps that convention in three layers:
//
// 1.  **`PredictorModule`**: the raw capability set, expressed as a trait so the
//     compiled model, the uniform stand-in and test doubles are interchangeable.
// 2.  **`InferenceAdapter`**: the marshalling routine. It is the only code that
//     touches handles, and it releases each one on every path out of the call,
//     success or failure. Nothing else in the crate can leak a handle.
// 3.  **`PredictorService`**: the shared, process-wide handle to an initialized
//     module. It owns the `Readiness` lifecycle, serializes calls behind a mutex,
//     and refuses to predict with a defined `NotReady` error until the one-time
//     model load has succeeded.

use crate::config::PipelineConfig;
use crate::core_modules::downsampler::InputVector;
use crate::core_modules::readiness::{ModelState, Readiness};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use thiserror::Error;

/// An opaque reference to a vector living inside the predictor module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub u64);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PredictorError {
    #[error("predictor is not ready ({0})")]
    NotReady(ModelState),
    #[error("model `{0}` failed to load")]
    LoadFailed(String),
    #[error("input has {actual} values, expected {expected}")]
    InputLength { expected: usize, actual: usize },
    #[error("unknown handle {0:?}")]
    UnknownHandle(Handle),
    #[error("output index {index} out of range for {len} values")]
    OutputIndex { index: usize, len: usize },
    #[error("predictor call failed: {0}")]
    Call(String),
    #[error("predictor lock poisoned")]
    Poisoned,
}

/// The capability set exposed by a loaded digit model.
pub trait PredictorModule: Send {
    /// One-time initialization. The module is unusable until this returns true.
    fn load_model(&mut self, model_path: &str) -> bool;
    fn new_input(&mut self) -> Result<Handle, PredictorError>;
    fn push_value(&mut self, input: Handle, value: f32) -> Result<(), PredictorError>;
    /// Runs the model on `input` and returns a handle to the output vector.
    fn predict(&mut self, input: Handle) -> Result<Handle, PredictorError>;
    fn read_output(&self, output: Handle, index: usize) -> Result<f32, PredictorError>;
    fn release(&mut self, handle: Handle);
}

/// Class probabilities for digits `0..len`, in digit order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityVector {
    pub values: Vec<f32>,
}

impl ProbabilityVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The digit with the highest probability, first one wins on ties.
    pub fn best(&self) -> Option<(usize, f32)> {
        self.values
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (digit, p)| match best {
                Some((_, top)) if top >= p => best,
                _ => Some((digit, p)),
            })
    }
}

pub struct InferenceAdapter;

impl InferenceAdapter {
    /// Marshals `input` into the module, predicts, and reads `classes` values back.
    /// Every handle obtained here is released before returning.
    pub fn run(
        module: &mut dyn PredictorModule,
        input: &InputVector,
        classes: usize,
    ) -> Result<ProbabilityVector, PredictorError> {
        let input_handle = module.new_input()?;
        let predicted = Self::fill_and_predict(module, input_handle, input);
        module.release(input_handle);

        let output_handle = predicted?;
        let read = Self::read_probabilities(module, output_handle, classes);
        module.release(output_handle);
        read
    }

    fn fill_and_predict(
        module: &mut dyn PredictorModule,
        handle: Handle,
        input: &InputVector,
    ) -> Result<Handle, PredictorError> {
        for value in &input.values {
            module.push_value(handle, *value)?;
        }
        module.predict(handle)
    }

    fn read_probabilities(
        module: &dyn PredictorModule,
        handle: Handle,
        classes: usize,
    ) -> Result<ProbabilityVector, PredictorError> {
        let values = (0..classes)
            .map(|digit| module.read_output(handle, digit))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ProbabilityVector::new(values))
    }
}

static GLOBAL_PREDICTOR: OnceLock<Arc<PredictorService>> = OnceLock::new();

/// A shared, readiness-gated handle to a predictor module.
pub struct PredictorService {
    readiness: Readiness,
    module: Mutex<Box<dyn PredictorModule>>,
    input_len: usize,
    classes: usize,
}

impl PredictorService {
    pub fn new(module: Box<dyn PredictorModule>, config: &PipelineConfig) -> Self {
        Self {
            readiness: Readiness::new(),
            module: Mutex::new(module),
            input_len: config.input_len(),
            classes: config.classes,
        }
    }

    /// Makes `service` the process-wide predictor. Fails if one is already installed.
    pub fn install_global(service: Arc<PredictorService>) -> Result<(), Arc<PredictorService>> {
        GLOBAL_PREDICTOR.set(service)
    }

    pub fn global() -> Option<Arc<PredictorService>> {
        GLOBAL_PREDICTOR.get().cloned()
    }

    pub fn ready(&self) -> bool {
        self.readiness.is_ready()
    }

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    /// Runs the module's one-time load on the calling thread and settles readiness.
    pub fn load_model_blocking(&self, model_path: &str) -> Result<(), PredictorError> {
        let loaded = {
            let mut module = self.module.lock().map_err(|_| PredictorError::Poisoned)?;
            module.load_model(model_path)
        };
        if loaded {
            info!("digit model `{model_path}` loaded");
            self.readiness.mark_ready();
            Ok(())
        } else {
            warn!("digit model `{model_path}` failed to load");
            self.readiness
                .mark_failed(format!("loadModel returned false for `{model_path}`"));
            Err(PredictorError::LoadFailed(model_path.to_string()))
        }
    }

    /// Loads the model off the async runtime's worker threads.
    pub async fn load(self: Arc<Self>, model_path: String) -> Result<(), PredictorError> {
        tokio::task::spawn_blocking(move || self.load_model_blocking(&model_path))
            .await
            .map_err(|e| PredictorError::Call(format!("model load task failed: {e}")))?
    }

    pub fn predict(&self, input: &InputVector) -> Result<ProbabilityVector, PredictorError> {
        if !self.ready() {
            return Err(PredictorError::NotReady(self.readiness.state()));
        }
        if input.len() != self.input_len {
            return Err(PredictorError::InputLength {
                expected: self.input_len,
                actual: input.len(),
            });
        }
        let mut module = self.module.lock().map_err(|_| PredictorError::Poisoned)?;
        InferenceAdapter::run(module.as_mut(), input, self.classes)
    }
}

/// Bookkeeping for module-side vectors, shared by in-process modules.
#[derive(Debug, Default)]
pub struct HandleTable {
    next: u64,
    vectors: HashMap<Handle, Vec<f32>>,
}

impl HandleTable {
    pub fn allocate(&mut self, values: Vec<f32>) -> Handle {
        self.next += 1;
        let handle = Handle(self.next);
        self.vectors.insert(handle, values);
        handle
    }

    pub fn get(&self, handle: Handle) -> Result<&Vec<f32>, PredictorError> {
        self.vectors.get(&handle).ok_or(PredictorError::UnknownHandle(handle))
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut Vec<f32>, PredictorError> {
        self.vectors
            .get_mut(&handle)
            .ok_or(PredictorError::UnknownHandle(handle))
    }

    pub fn read(&self, handle: Handle, index: usize) -> Result<f32, PredictorError> {
        let values = self.get(handle)?;
        values.get(index).copied().ok_or(PredictorError::OutputIndex {
            index,
            len: values.len(),
        })
    }

    pub fn release(&mut self, handle: Handle) {
        self.vectors.remove(&handle);
    }

    /// Number of handles allocated and not yet released.
    pub fn live(&self) -> usize {
        self.vectors.len()
    }
}

/// Stand-in used when no compiled model is attached: every digit is equally likely.
#[derive(Debug)]
pub struct UniformModule {
    classes: usize,
    handles: HandleTable,
}

impl UniformModule {
    pub fn new(classes: usize) -> Self {
        Self {
            classes,
            handles: HandleTable::default(),
        }
    }
}

impl PredictorModule for UniformModule {
    fn load_model(&mut self, _model_path: &str) -> bool {
        self.classes > 0
    }

    fn new_input(&mut self) -> Result<Handle, PredictorError> {
        Ok(self.handles.allocate(Vec::new()))
    }

    fn push_value(&mut self, input: Handle, value: f32) -> Result<(), PredictorError> {
        self.handles.get_mut(input)?.push(value);
        Ok(())
    }

    fn predict(&mut self, input: Handle) -> Result<Handle, PredictorError> {
        self.handles.get(input)?;
        let p = 1.0 / self.classes as f32;
        Ok(self.handles.allocate(vec![p; self.classes]))
    }

    fn read_output(&self, output: Handle, index: usize) -> Result<f32, PredictorError> {
        self.handles.read(output, index)
    }

    fn release(&mut self, handle: Handle) {
        self.handles.release(handle);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::sync::atomic::Ordering;

    fn blank_input() -> InputVector {
        InputVector {
            width: 28,
            height: 28,
            values: vec![0.0; 784],
        }
    }

    const KNOWN: [f32; 10] = [0.01, 0.02, 0.03, 0.04, 0.5, 0.1, 0.1, 0.1, 0.05, 0.05];

    #[test]
    fn adapter_reads_ten_values_in_digit_order() {
        let mut module = FixedModule::new(KNOWN.to_vec());
        let result = InferenceAdapter::run(&mut module, &blank_input(), 10);
        assert_eq!(result, Ok(ProbabilityVector::new(KNOWN.to_vec())));
        assert_eq!(module.handles.live(), 0);
    }

    #[test]
    fn handles_are_released_on_every_failure_path() {
        for fail_at in [FailAt::Push, FailAt::Predict, FailAt::Read] {
            let mut module = FixedModule::new(KNOWN.to_vec());
            module.fail_at = fail_at;
            let result = InferenceAdapter::run(&mut module, &blank_input(), 10);
            assert!(result.is_err(), "{fail_at:?}");
            assert_eq!(module.handles.live(), 0, "{fail_at:?} leaked a handle");
        }
    }

    #[test]
    fn short_output_is_an_error_not_a_panic() {
        let mut module = FixedModule::new(vec![1.0; 3]);
        let result = InferenceAdapter::run(&mut module, &blank_input(), 10);
        assert_eq!(result, Err(PredictorError::OutputIndex { index: 3, len: 3 }));
        assert_eq!(module.handles.live(), 0);
    }

    #[test]
    fn service_refuses_before_readiness() {
        let module = FixedModule::new(KNOWN.to_vec());
        let calls = module.calls.clone();
        let service = PredictorService::new(Box::new(module), &PipelineConfig::default());
        assert!(!service.ready());
        assert_eq!(
            service.predict(&blank_input()),
            Err(PredictorError::NotReady(ModelState::Loading))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn service_checks_input_length() {
        let service = ready_service(FixedModule::new(KNOWN.to_vec()));
        let short = InputVector { width: 2, height: 2, values: vec![0.0; 4] };
        assert_eq!(
            service.predict(&short),
            Err(PredictorError::InputLength { expected: 784, actual: 4 })
        );
    }

    #[test]
    fn blank_input_reaches_the_module_as_zeros() {
        let module = FixedModule::new(KNOWN.to_vec());
        let seen = module.last_input.clone();
        let service = ready_service(module);
        let first = service.predict(&blank_input());
        let second = service.predict(&blank_input());
        assert_eq!(first, second);

        let seen = seen.lock().map(|s| s.clone()).unwrap_or_default();
        let values = seen.unwrap_or_default();
        assert_eq!(values.len(), 784);
        assert!(values.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn uniform_module_loads_and_predicts_flat() {
        let service = PredictorService::new(
            Box::new(UniformModule::new(10)),
            &PipelineConfig::default(),
        );
        assert!(service.load_model_blocking("flatmodel_large.bin").is_ok());
        let result = service.predict(&blank_input()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(result.len(), 10);
        assert!(result.values.iter().all(|p| (*p - 0.1).abs() < 1e-6));
        assert_eq!(result.best(), Some((0, 0.1)));
    }

    struct RefusingModule;

    impl PredictorModule for RefusingModule {
        fn load_model(&mut self, _model_path: &str) -> bool {
            false
        }
        fn new_input(&mut self) -> Result<Handle, PredictorError> {
            Err(PredictorError::Call("unloaded".into()))
        }
        fn push_value(&mut self, _: Handle, _: f32) -> Result<(), PredictorError> {
            Err(PredictorError::Call("unloaded".into()))
        }
        fn predict(&mut self, _: Handle) -> Result<Handle, PredictorError> {
            Err(PredictorError::Call("unloaded".into()))
        }
        fn read_output(&self, _: Handle, _: usize) -> Result<f32, PredictorError> {
            Err(PredictorError::Call("unloaded".into()))
        }
        fn release(&mut self, _: Handle) {}
    }

    #[tokio::test]
    async fn failed_load_settles_readiness_as_failed() {
        let service = Arc::new(PredictorService::new(
            Box::new(RefusingModule),
            &PipelineConfig::default(),
        ));
        let result = service.clone().load("missing.bin".to_string()).await;
        assert_eq!(result, Err(PredictorError::LoadFailed("missing.bin".into())));
        assert!(matches!(service.readiness().state(), ModelState::Failed(_)));
        assert!(service.readiness().wait_ready().await.is_err());
    }

    #[test]
    fn best_prefers_the_first_of_equal_maxima() {
        let v = ProbabilityVector::new(vec![0.2, 0.4, 0.4]);
        assert_eq!(v.best(), Some((1, 0.4)));
        assert_eq!(ProbabilityVector::new(Vec::new()).best(), None);
    }
}
