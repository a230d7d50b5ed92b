// snap-overlay-rs/src/core/overlay/table.rs

//! Segment and overlay descriptor tables
//!
//! Tables are complete by construction: every `SegmentId`/`OverlayId` has
//! exactly one descriptor, so `get()` never fails. Tables can also be read
//! from a big-endian binary image laid out in id order.

use crate::core::memory::Window;
use crate::core::overlay::{
    Overlay, OverlayId, SegmentDescriptor, SegmentId, TableError, TableResult,
};
use bytemuck::{Pod, Zeroable};
use log::debug;
use std::mem::size_of;

/// On-image segment entry (big-endian words)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RawSegmentEntry {
    pub rom_start: u32,
    pub rom_end: u32,
    pub ram_dest: u32,
}

/// On-image overlay entry (big-endian words)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RawOverlayEntry {
    pub rom_start: u32,
    pub rom_end: u32,
    pub vram_start: u32,
    pub text_start: u32,
    pub text_end: u32,
    pub data_start: u32,
    pub data_end: u32,
    pub bss_start: u32,
    pub bss_end: u32,
}

fn read_entries<T: Pod>(image: &[u8], count: usize) -> TableResult<impl Iterator<Item = T> + '_> {
    let expected = size_of::<T>() * count;
    if image.len() < expected {
        return Err(TableError::TruncatedImage {
            expected,
            actual: image.len(),
        });
    }
    Ok(image[..expected]
        .chunks_exact(size_of::<T>())
        .map(bytemuck::pod_read_unaligned::<T>))
}

/// Static segment descriptors indexed by `SegmentId`
#[derive(Debug, Clone)]
pub struct SegmentTable {
    entries: Vec<SegmentDescriptor>,
}

impl SegmentTable {
    /// Builds a table; every id must appear exactly once
    pub fn new(descriptors: impl IntoIterator<Item = SegmentDescriptor>) -> TableResult<Self> {
        let mut slots: [Option<SegmentDescriptor>; SegmentId::COUNT] = [None; SegmentId::COUNT];

        for descriptor in descriptors {
            descriptor.validate()?;
            let slot = &mut slots[descriptor.id.index()];
            if slot.is_some() {
                return Err(TableError::DuplicateSegment(descriptor.id));
            }
            *slot = Some(descriptor);
        }

        let entries = SegmentId::ALL
            .iter()
            .map(|&id| slots[id.index()].ok_or(TableError::MissingSegment(id)))
            .collect::<TableResult<Vec<_>>>()?;

        debug!("Segment table built with {} entries", entries.len());
        Ok(Self { entries })
    }

    /// Parses `SegmentId::COUNT` entries in id order
    pub fn from_image(image: &[u8]) -> TableResult<Self> {
        let descriptors = read_entries::<RawSegmentEntry>(image, SegmentId::COUNT)?
            .zip(SegmentId::ALL)
            .map(|(raw, id)| {
                SegmentDescriptor::new(
                    id,
                    u32::from_be(raw.rom_start),
                    u32::from_be(raw.rom_end),
                    u32::from_be(raw.ram_dest),
                )
            })
            .collect::<TableResult<Vec<_>>>()?;
        Self::new(descriptors)
    }

    /// Serializes the table in the image layout
    pub fn to_image(&self) -> Vec<u8> {
        let mut image = Vec::with_capacity(size_of::<RawSegmentEntry>() * self.entries.len());
        for entry in &self.entries {
            let raw = RawSegmentEntry {
                rom_start: entry.rom_start.to_be(),
                rom_end: entry.rom_end.to_be(),
                ram_dest: entry.ram_dest.to_be(),
            };
            image.extend_from_slice(bytemuck::bytes_of(&raw));
        }
        image
    }

    pub fn get(&self, id: SegmentId) -> &SegmentDescriptor {
        &self.entries[id.index()]
    }

    /// Runtime lookup by link-time name
    pub fn lookup(&self, name: &str) -> TableResult<&SegmentDescriptor> {
        SegmentId::from_name(name)
            .map(|id| self.get(id))
            .ok_or_else(|| TableError::UnknownName(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SegmentDescriptor> {
        self.entries.iter()
    }
}

/// Static overlay descriptors indexed by `OverlayId`
#[derive(Debug, Clone)]
pub struct OverlayTable {
    entries: Vec<Overlay>,
}

impl OverlayTable {
    pub fn new(overlays: impl IntoIterator<Item = Overlay>) -> TableResult<Self> {
        let mut slots: [Option<Overlay>; OverlayId::COUNT] = [None; OverlayId::COUNT];

        for overlay in overlays {
            overlay.validate()?;
            let slot = &mut slots[overlay.id.index()];
            if slot.is_some() {
                return Err(TableError::DuplicateOverlay(overlay.id));
            }
            *slot = Some(overlay);
        }

        let entries = OverlayId::ALL
            .iter()
            .map(|&id| slots[id.index()].ok_or(TableError::MissingOverlay(id)))
            .collect::<TableResult<Vec<_>>>()?;

        debug!("Overlay table built with {} entries", entries.len());
        Ok(Self { entries })
    }

    pub fn from_image(image: &[u8]) -> TableResult<Self> {
        let overlays = read_entries::<RawOverlayEntry>(image, OverlayId::COUNT)?
            .zip(OverlayId::ALL)
            .map(|(raw, id)| {
                let window = |start: u32, end: u32| {
                    let (start, end) = (u32::from_be(start), u32::from_be(end));
                    Window::new(start, end).ok_or(TableError::InvalidRange {
                        name: id.name(),
                        start,
                        end,
                    })
                };
                Ok(Overlay {
                    id,
                    rom_start: u32::from_be(raw.rom_start),
                    rom_end: u32::from_be(raw.rom_end),
                    vram_start: u32::from_be(raw.vram_start),
                    text: window(raw.text_start, raw.text_end)?,
                    data: window(raw.data_start, raw.data_end)?,
                    bss: window(raw.bss_start, raw.bss_end)?,
                })
            })
            .collect::<TableResult<Vec<_>>>()?;
        Self::new(overlays)
    }

    pub fn to_image(&self) -> Vec<u8> {
        let mut image = Vec::with_capacity(size_of::<RawOverlayEntry>() * self.entries.len());
        for overlay in &self.entries {
            let raw = RawOverlayEntry {
                rom_start: overlay.rom_start.to_be(),
                rom_end: overlay.rom_end.to_be(),
                vram_start: overlay.vram_start.to_be(),
                text_start: overlay.text.start.to_be(),
                text_end: overlay.text.end.to_be(),
                data_start: overlay.data.start.to_be(),
                data_end: overlay.data.end.to_be(),
                bss_start: overlay.bss.start.to_be(),
                bss_end: overlay.bss.end.to_be(),
            };
            image.extend_from_slice(bytemuck::bytes_of(&raw));
        }
        image
    }

    pub fn get(&self, id: OverlayId) -> &Overlay {
        &self.entries[id.index()]
    }

    pub fn lookup(&self, name: &str) -> TableResult<&Overlay> {
        OverlayId::from_name(name)
            .map(|id| self.get(id))
            .ok_or_else(|| TableError::UnknownName(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Overlay> {
        self.entries.iter()
    }
}
