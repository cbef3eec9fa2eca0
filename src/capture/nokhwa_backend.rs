//! Webcam-backed platform using nokhwa.
//!
//! Desktop webcams have no facing metadata, so the lens selector maps onto
//! device indices: back is the primary device, front the secondary one.
//! The device is opened per picture on a one-shot worker thread, which keeps
//! the nokhwa handle off the async runtime. Webcams expose no torch.

use super::platform::{
    BindError, BindRequest, BoundCamera, BoundSession, CameraPlatform, CameraProvider,
    EncodeError, ImageCaptureEndpoint, PhotoSink, ProviderError, TorchState,
};
use super::{CaptureMode, LensFacing};
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Camera platform backed by the host's native capture API.
#[derive(Debug, Clone)]
pub struct NokhwaPlatform {
    /// Device index used for the back lens.
    primary: u32,
}

impl NokhwaPlatform {
    pub fn new(primary: u32) -> Self {
        Self { primary }
    }
}

#[async_trait]
impl CameraPlatform for NokhwaPlatform {
    async fn acquire_provider(&self) -> Result<Arc<dyn CameraProvider>, ProviderError> {
        let devices = tokio::task::spawn_blocking(|| nokhwa::query(ApiBackend::Auto))
            .await
            .map_err(|_| ProviderError::Interrupted)?
            .map_err(|e| ProviderError::ExecutionFailed(e.to_string()))?;

        let indices: Vec<u32> = devices
            .iter()
            .filter_map(|info| info.index().as_index().ok())
            .collect();

        tracing::info!(devices = indices.len(), "Queried native cameras");

        Ok(Arc::new(NokhwaProvider {
            primary: self.primary,
            indices,
        }))
    }
}

struct NokhwaProvider {
    primary: u32,
    indices: Vec<u32>,
}

impl NokhwaProvider {
    fn device_for(&self, facing: LensFacing) -> Option<u32> {
        match facing {
            LensFacing::Back => self.indices.iter().copied().find(|&i| i == self.primary),
            LensFacing::Front => self.indices.iter().copied().find(|&i| i != self.primary),
        }
    }
}

impl CameraProvider for NokhwaProvider {
    fn unbind_all(&self) {
        // Devices are only held for the duration of a single capture.
    }

    fn bind(&self, request: &BindRequest) -> Result<BoundSession, BindError> {
        let device = self
            .device_for(request.facing)
            .ok_or(BindError::NoMatchingCamera(request.facing))?;

        tracing::info!(
            device,
            facing = %request.facing,
            aspect = %request.preview.target_aspect,
            "Bound native camera"
        );

        Ok(BoundSession {
            camera: Arc::new(NoTorch),
            image_capture: Arc::new(NokhwaCapture {
                device,
                mode: request.capture.mode,
            }),
        })
    }
}

struct NoTorch;

impl BoundCamera for NoTorch {
    fn has_flash_unit(&self) -> bool {
        false
    }

    fn torch_state(&self) -> TorchState {
        TorchState::Off
    }

    fn enable_torch(&self, _enabled: bool) {}
}

struct NokhwaCapture {
    device: u32,
    mode: CaptureMode,
}

impl NokhwaCapture {
    fn quality(&self) -> u8 {
        match self.mode {
            CaptureMode::MinimizeLatency => 85,
            CaptureMode::MaximizeQuality => 95,
        }
    }
}

fn grab_and_encode(device: u32, quality: u8, sink: &mut PhotoSink) -> Result<(), EncodeError> {
    let requested =
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
    let mut camera = nokhwa::Camera::new(CameraIndex::Index(device), requested)
        .map_err(|e| EncodeError::new(e.to_string()))?;
    camera
        .open_stream()
        .map_err(|e| EncodeError::new(e.to_string()))?;

    let frame = camera.frame().map_err(|e| EncodeError::new(e.to_string()));
    let _ = camera.stop_stream();
    let decoded = frame?
        .decode_image::<RgbFormat>()
        .map_err(|e| EncodeError::new(e.to_string()))?;

    let (width, height) = decoded.dimensions();
    JpegEncoder::new_with_quality(&mut *sink, quality)
        .encode(decoded.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::new(e.to_string()))?;
    sink.flush().map_err(|e| EncodeError::new(e.to_string()))
}

#[async_trait]
impl ImageCaptureEndpoint for NokhwaCapture {
    async fn take_picture(&self, mut sink: PhotoSink) -> Result<(), EncodeError> {
        let device = self.device;
        let quality = self.quality();
        let (tx, rx) = oneshot::channel();

        std::thread::spawn(move || {
            let result = grab_and_encode(device, quality, &mut sink);
            drop(sink);
            let _ = tx.send(result);
        });

        rx.await
            .unwrap_or_else(|_| Err(EncodeError::new("capture worker exited")))
    }
}
