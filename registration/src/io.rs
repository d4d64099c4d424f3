//! Collaborators at the edges of the pipeline. Decoding, file naming and
//! persistence live behind these traits.

use align_core::Result;
use image::GrayImage;

/// Supplies the ordered frame sequence; the first frame is the anchor.
pub trait ImageSource {
    fn frames(&mut self) -> Result<Vec<GrayImage>>;
}

/// Receives aligned frames in index order.
pub trait ImageSink {
    fn accept(&mut self, index: usize, image: &GrayImage) -> Result<()>;
}

/// In-memory source. Frames are handed out once; later calls yield nothing.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    frames: Vec<GrayImage>,
}

impl VecSource {
    pub fn new(frames: Vec<GrayImage>) -> Self {
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl ImageSource for VecSource {
    fn frames(&mut self) -> Result<Vec<GrayImage>> {
        Ok(std::mem::take(&mut self.frames))
    }
}

impl From<Vec<GrayImage>> for VecSource {
    fn from(frames: Vec<GrayImage>) -> Self {
        Self::new(frames)
    }
}

/// Collects delivered frames together with their indices.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    frames: Vec<(usize, GrayImage)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[(usize, GrayImage)] {
        &self.frames
    }

    pub fn indices(&self) -> Vec<usize> {
        self.frames.iter().map(|(i, _)| *i).collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn into_images(self) -> Vec<GrayImage> {
        self.frames.into_iter().map(|(_, img)| img).collect()
    }
}

impl ImageSink for MemorySink {
    fn accept(&mut self, index: usize, image: &GrayImage) -> Result<()> {
        self.frames.push((index, image.clone()));
        Ok(())
    }
}
