//! Texture bookkeeping for the placeholder → final swap.
//!
//! One slot per requested image. Slots resolve out of order, either with the
//! loaded texture or with a synthesized solid-color fallback, and the set
//! reports completion exactly once: on the resolution that fills the last
//! empty slot. A slot keeps its first resolution; anything arriving later for
//! the same slot is ignored.

use crate::config::BodySpec;
use crate::engine::{rgb, Rgb};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Loaded(T),
    /// `texture` is `None` when no image could be synthesized either; the
    /// body is then drawn with the flat fallback color.
    Fallback { color: Rgb, texture: Option<T> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    Pending { resolved: usize, total: usize },
    /// Returned once, by the resolution that filled the last slot.
    Complete,
    /// Unknown slot, or the slot already had a resolution.
    Ignored,
}

#[derive(Debug)]
struct Slot<T> {
    name: String,
    url: String,
    fallback_color: Rgb,
    resolution: Option<Resolution<T>>,
}

#[derive(Debug)]
pub struct TextureSet<T> {
    slots: Vec<Slot<T>>,
    resolved: usize,
    completed: bool,
}

impl<T> Default for TextureSet<T> {
    fn default() -> Self {
        TextureSet { slots: Vec::new(), resolved: 0, completed: false }
    }
}

impl<T> TextureSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// One slot per body, in catalog order, so `SlotId(i)` belongs to body `i`.
    pub fn for_bodies(bodies: &[BodySpec]) -> Self {
        let mut set = Self::new();
        for body in bodies {
            set.request(&body.name, &body.texture_url, rgb(body.fallback_color));
        }
        set
    }

    pub fn request(&mut self, name: &str, url: &str, fallback_color: Rgb) -> SlotId {
        self.slots.push(Slot {
            name: name.to_string(),
            url: url.to_string(),
            fallback_color,
            resolution: None,
        });
        SlotId(self.slots.len() - 1)
    }

    /// `(slot, name, url)` for every slot still waiting on a fetch.
    pub fn pending(&self) -> Vec<(SlotId, String, String)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.resolution.is_none())
            .map(|(i, s)| (SlotId(i), s.name.clone(), s.url.clone()))
            .collect()
    }

    pub fn get(&self, slot: SlotId) -> Option<&Resolution<T>> {
        self.slots.get(slot.0).and_then(|s| s.resolution.as_ref())
    }

    /// Records the outcome of one fetch. `fallback` is only called when the
    /// fetch failed and the slot is still empty.
    pub fn resolve<E>(&mut self, slot: SlotId, outcome: Result<T, E>, fallback: impl FnOnce(Rgb) -> Option<T>) -> ResolveOutcome {
        let Some(entry) = self.slots.get_mut(slot.0) else {
            return ResolveOutcome::Ignored;
        };
        if entry.resolution.is_some() {
            return ResolveOutcome::Ignored;
        }

        entry.resolution = Some(match outcome {
            Ok(texture) => Resolution::Loaded(texture),
            Err(_) => Resolution::Fallback {
                color: entry.fallback_color,
                texture: fallback(entry.fallback_color),
            },
        });
        self.resolved += 1;

        if self.resolved == self.slots.len() && !self.completed {
            self.completed = true;
            ResolveOutcome::Complete
        } else {
            ResolveOutcome::Pending { resolved: self.resolved, total: self.slots.len() }
        }
    }
}

/// RGBA pixels for a `size`×`size` image filled with one color.
pub fn solid_pixels(color: Rgb, size: u32) -> Vec<u8> {
    let px = [to_byte(color.0), to_byte(color.1), to_byte(color.2), 255];
    px.repeat((size * size) as usize)
}

/// RGBA pixels for a soft round glow, opaque white at the center fading to
/// transparent at the edge. Tinted by the material color when drawn.
pub fn glow_pixels(size: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    let half = size as f32 / 2.0;
    for y in 0..size {
        for x in 0..size {
            let dx = (x as f32 + 0.5 - half) / half;
            let dy = (y as f32 + 0.5 - half) / half;
            let falloff = (1.0 - (dx * dx + dy * dy).sqrt()).clamp(0.0, 1.0);
            pixels.extend_from_slice(&[255, 255, 255, to_byte(falloff * falloff)]);
        }
    }
    pixels
}

fn to_byte(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(names: &[&str]) -> TextureSet<&'static str> {
        let mut set = TextureSet::new();
        for name in names {
            set.request(name, &format!("/{name}.jpg"), (1.0, 0.0, 0.0));
        }
        set
    }

    #[test]
    fn completes_once_after_every_slot_in_any_order() {
        let mut set = set_of(&["a", "b", "c"]);
        let ok: Result<_, ()> = Ok("tex");
        assert_eq!(
            set.resolve(SlotId(2), ok, |_| Some("fallback")),
            ResolveOutcome::Pending { resolved: 1, total: 3 }
        );
        assert_eq!(
            set.resolve(SlotId(0), Err(()), |_| Some("fallback")),
            ResolveOutcome::Pending { resolved: 2, total: 3 }
        );
        assert!(!set.completed);
        assert_eq!(set.resolve(SlotId(1), ok, |_| Some("fallback")), ResolveOutcome::Complete);
        assert!(set.completed);
        assert_eq!(set.resolve(SlotId(1), ok, |_| Some("fallback")), ResolveOutcome::Ignored);
    }

    #[test]
    fn first_resolution_wins() {
        let mut set = set_of(&["a", "b"]);
        set.resolve(SlotId(0), Err::<&str, _>("timeout"), |_| Some("fallback"));
        let late: Result<_, ()> = Ok("late");
        assert_eq!(set.resolve(SlotId(0), late, |_| Some("fallback")), ResolveOutcome::Ignored);
        assert_eq!(set.resolved, 1);
        assert_eq!(
            set.get(SlotId(0)),
            Some(&Resolution::Fallback { color: (1.0, 0.0, 0.0), texture: Some("fallback") })
        );
    }

    #[test]
    fn duplicate_names_are_separate_slots() {
        let mut set = set_of(&["earth", "earth"]);
        let ok: Result<_, ()> = Ok("tex");
        assert!(matches!(set.resolve(SlotId(0), ok, |_| Some("f")), ResolveOutcome::Pending { .. }));
        assert_eq!(set.resolve(SlotId(1), ok, |_| Some("f")), ResolveOutcome::Complete);
    }

    #[test]
    fn unknown_slot_is_ignored() {
        let mut set = set_of(&["a"]);
        let ok: Result<_, ()> = Ok("tex");
        assert_eq!(set.resolve(SlotId(7), ok, |_| Some("f")), ResolveOutcome::Ignored);
        assert_eq!(set.pending().len(), 1);
    }

    #[test]
    fn fallback_not_built_for_success() {
        let mut set = set_of(&["a"]);
        let ok: Result<_, ()> = Ok("tex");
        set.resolve(SlotId(0), ok, |_| panic!("fallback built for a loaded texture"));
        assert_eq!(set.get(SlotId(0)), Some(&Resolution::Loaded("tex")));
    }

    #[test]
    fn solid_pixels_fill_whole_image() {
        let pixels = solid_pixels((1.0, 0.5, 0.0), 4);
        assert_eq!(pixels.len(), 4 * 4 * 4);
        assert!(pixels.chunks(4).all(|p| p == [255, 128, 0, 255]));
    }

    #[test]
    fn glow_fades_toward_edge() {
        let size = 32;
        let pixels = glow_pixels(size);
        let alpha = |x: u32, y: u32| pixels[((y * size + x) * 4 + 3) as usize];
        assert!(alpha(16, 16) > 200);
        assert_eq!(alpha(0, 0), 0);
    }
}
