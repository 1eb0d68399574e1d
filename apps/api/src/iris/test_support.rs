//! Shared fixtures for pipeline and route tests.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};

use crate::image_client::{GenerationRequest, ImageGenError, IrisGenerator};

pub(crate) fn png_bytes(side: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(side, side, Rgba(rgba));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

enum StubReply {
    Image(Vec<u8>),
    Empty,
    Fail { status: u16, message: String },
}

/// In-process generator that records every call.
pub(crate) struct StubGenerator {
    reply: StubReply,
    calls: AtomicUsize,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl StubGenerator {
    fn with_reply(reply: StubReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub(crate) fn returning(bytes: Vec<u8>) -> Self {
        Self::with_reply(StubReply::Image(bytes))
    }

    pub(crate) fn empty() -> Self {
        Self::with_reply(StubReply::Empty)
    }

    pub(crate) fn failing(status: u16, message: &str) -> Self {
        Self::with_reply(StubReply::Fail {
            status,
            message: message.to_string(),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl IrisGenerator for StubGenerator {
    fn strategy(&self) -> &'static str {
        "stub"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<u8>, ImageGenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        match &self.reply {
            StubReply::Image(bytes) => Ok(bytes.clone()),
            StubReply::Empty => Err(ImageGenError::EmptyResponse),
            StubReply::Fail { status, message } => Err(ImageGenError::Api {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}
