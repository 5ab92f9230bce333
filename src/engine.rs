use image::RgbaImage;
use log::{debug, info};
use parking_lot::Mutex;
use std::time::Instant;

use crate::config::EngineAccess;
use crate::errors::Result;
use crate::traits::SegmentationEngine;

/// The loaded engine, shared by reference with every job of a run.
///
/// Nothing mutates the engine after construction. With `EngineAccess::Serialized`
/// each call also holds `gate`, so at most one inference runs at a time.
pub struct EngineHandle<E: SegmentationEngine> {
    engine: E,
    access: EngineAccess,
    gate: Mutex<()>,
}

impl<E: SegmentationEngine> EngineHandle<E> {
    pub fn new(engine: E, access: EngineAccess) -> Self {
        Self {
            engine,
            access,
            gate: Mutex::new(()),
        }
    }

    /// Load the engine once. Any error is fatal for the run.
    pub fn initialize<F>(access: EngineAccess, init: F) -> Result<Self>
    where
        F: FnOnce() -> Result<E>,
    {
        let started = Instant::now();
        let engine = init()?;
        info!(
            "Loaded model `{}` in {:.2?} ({:?} access)",
            engine.model_name(),
            started.elapsed(),
            access
        );
        Ok(Self::new(engine, access))
    }

    /// Segment one image and normalize the result to RGBA.
    pub fn segment(&self, image: &RgbaImage) -> Result<RgbaImage> {
        let output = match self.access {
            EngineAccess::Shared => self.engine.segment(image),
            EngineAccess::Serialized => {
                let _guard = self.gate.lock();
                debug!("Engine gate acquired");
                self.engine.segment(image)
            }
        }?;
        output.into_rgba8()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}
