// Renderer Module - frame compositor and the self-rescheduling animation driver
use anyhow::Result;
use log::{debug, info, trace, warn};
use std::future::Future;
use std::io;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use crate::bitmap::{Bitmap, Ink};
use crate::config::ThumpaConfig;
use crate::display::Display;
use crate::dither::DitherTable;
use crate::model::{ModelRenderer, RotationState};
use crate::plasma::{Banding, Plasma, PlasmaState};
use crate::trig::SineTable;
use crate::types::{Button, HostEvent, ModeExitReason, Rgb, SCREEN_TOTAL_HEIGHT, SCREEN_TOTAL_WIDTH};

/// Nominal delay between frames; 0 or 1 starves the host
pub const TICK_MS: u64 = 3;

/// Display surface: what the host shows, the plasma bitmap, and a dirty flag
pub struct Surface {
    pub screen: Bitmap,
    pub image: Bitmap,
    dirty: bool,
}

impl Surface {
    pub fn new() -> Self {
        Surface {
            screen: Bitmap::new(SCREEN_TOTAL_WIDTH, SCREEN_TOTAL_HEIGHT),
            image: Bitmap::new(SCREEN_TOTAL_WIDTH, SCREEN_TOTAL_HEIGHT),
            dirty: false,
        }
    }

    /// Ask for a redraw on the next pass
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[cfg(test)]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear and return the dirty flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

/// Draws one composite frame: plasma underneath, wireframe on top.
///
/// Which layers exist is fixed when the compositor is built. Each `draw`
/// advances every enabled layer's animation state exactly once.
pub struct Compositor {
    sines: SineTable,
    dither: DitherTable,
    plasma: Option<Plasma>,
    model: Option<ModelRenderer>,
}

impl Compositor {
    pub fn new(plasma_enabled: bool, model_enabled: bool, model_scale: i32) -> Self {
        let plasma = plasma_enabled.then(|| Plasma::new(Banding::for_overlay(model_enabled)));
        let model = model_enabled.then(|| ModelRenderer::new(model_scale));
        Compositor {
            sines: SineTable::new(),
            dither: DitherTable::new(),
            plasma,
            model,
        }
    }

    pub fn from_config(config: &ThumpaConfig) -> Self {
        Self::new(config.plasma, config.model, config.model_scale)
    }

    pub fn draw(&mut self, surface: &mut Surface) {
        match self.plasma.as_mut() {
            Some(plasma) => {
                plasma.render(&mut surface.image.raster(), &self.sines, &self.dither);
                surface.screen.blit(&surface.image);
            }
            None => surface.screen.fill(Ink::White),
        }

        if let Some(model) = self.model.as_mut() {
            surface.screen.set_stroke(Ink::Black);
            model.render(&mut surface.screen, &self.sines);
        }
    }

    pub fn set_model_scale(&mut self, model_scale: i32) {
        if let Some(model) = self.model.as_mut() {
            model.model_scale = model_scale;
        }
    }

    pub fn plasma_state(&self) -> Option<PlasmaState> {
        self.plasma.as_ref().map(|p| p.state)
    }

    pub fn rotation_state(&self) -> Option<RotationState> {
        self.model.as_ref().map(|m| m.rotation)
    }

    pub fn has_plasma(&self) -> bool {
        self.plasma.is_some()
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }
}

/// Fixed-delay one-shot timer, re-armed by the loop after each frame.
/// A slow frame pushes the next tick back; ticks are never queued.
pub struct OneShotTimer {
    delay: Duration,
}

impl OneShotTimer {
    pub fn new(delay_ms: u64) -> Self {
        OneShotTimer {
            delay: Duration::from_millis(delay_ms),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn set_delay(&mut self, delay_ms: u64) {
        self.delay = Duration::from_millis(delay_ms);
    }

    pub async fn wait(&self) {
        tokio::time::sleep(self.delay).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub checksum: u64,
    pub exit: ModeExitReason,
    pub elapsed: Duration,
}

pub struct Renderer {
    compositor: Compositor,
    surface: Surface,
    timer: OneShotTimer,
    frame_limit: Option<u64>,
    config: ThumpaConfig,
    reloads: Option<Receiver<ThumpaConfig>>,
}

impl Renderer {
    pub fn new(config: &ThumpaConfig) -> Self {
        Renderer {
            compositor: Compositor::from_config(config),
            surface: Surface::new(),
            timer: OneShotTimer::new(config.tick_ms),
            frame_limit: (config.frames > 0).then_some(config.frames),
            config: config.clone(),
            reloads: None,
        }
    }

    /// Apply configuration edits delivered on `reloads` between frames
    pub fn with_reloads(mut self, reloads: Receiver<ThumpaConfig>) -> Self {
        self.reloads = Some(reloads);
        self
    }

    #[cfg(test)]
    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Timer callback: mark the surface dirty and let the host redraw it
    pub fn tick(&mut self) -> bool {
        self.surface.mark_dirty();
        self.redraw()
    }

    /// Host side of the dirty flag: draw only when something asked for it
    pub fn redraw(&mut self) -> bool {
        if !self.surface.take_dirty() {
            return false;
        }
        self.compositor.draw(&mut self.surface);
        true
    }

    /// Run until Ctrl+C, a host quit event or the frame limit
    pub async fn run(&mut self, display: &mut dyn Display) -> Result<RunSummary> {
        self.run_until(display, tokio::signal::ctrl_c()).await
    }

    /// Like `run`, but stops when `interrupt` resolves to `Ok`. An `Err` only
    /// disables the interrupt; the loop keeps going.
    pub async fn run_until<F>(&mut self, display: &mut dyn Display, interrupt: F) -> Result<RunSummary>
    where
        F: Future<Output = io::Result<()>>,
    {
        let start = Instant::now();
        let mut frames: u64 = 0;

        let (ink, paper) = self.palette();
        display.set_palette(ink, paper);
        info!(
            "Rendering (plasma: {}, model: {}, tick {} ms)",
            self.compositor.has_plasma(),
            self.compositor.has_model(),
            self.timer.delay().as_millis()
        );

        tokio::pin!(interrupt);
        let mut interrupt_armed = true;

        let exit = 'frames: loop {
            tokio::select! {
                result = &mut interrupt, if interrupt_armed => match result {
                    Ok(()) => break 'frames ModeExitReason::UserQuit,
                    Err(e) => {
                        warn!("Ctrl+C handler unavailable: {}", e);
                        interrupt_armed = false;
                        continue 'frames;
                    }
                },
                _ = self.timer.wait() => {}
            }

            if self.tick() {
                frames += 1;
                display.present(&self.surface.screen, frames)?;
                if frames % 1000 == 0 {
                    debug!("frame {} ({:.1} fps)", frames, frames as f64 / start.elapsed().as_secs_f64());
                }
            }

            while let Some(event) = display.poll_event()? {
                match event {
                    HostEvent::Quit => break 'frames ModeExitReason::UserQuit,
                    HostEvent::Button(button) => on_button(button),
                }
            }

            self.apply_reloads(display);

            if self.frame_limit.is_some_and(|limit| frames >= limit) {
                break ModeExitReason::FrameLimit;
            }
        };

        debug!(
            "final plasma {:?}, rotation {:?}",
            self.compositor.plasma_state(),
            self.compositor.rotation_state()
        );

        Ok(RunSummary {
            frames,
            checksum: self.surface.screen.checksum(),
            exit,
            elapsed: start.elapsed(),
        })
    }

    fn palette(&self) -> (Rgb, Rgb) {
        let ink = Rgb::from_hex(&self.config.ink_color).unwrap_or(Rgb::BLACK);
        let paper = Rgb::from_hex(&self.config.paper_color).unwrap_or(Rgb::WHITE);
        (ink, paper)
    }

    fn apply_reloads(&mut self, display: &mut dyn Display) {
        let Some(reloads) = self.reloads.as_ref() else {
            return;
        };
        // Only the newest edit matters
        let Some(new_config) = reloads.try_iter().last() else {
            return;
        };

        if new_config.tick_ms != self.config.tick_ms {
            info!("tick interval {} ms -> {} ms", self.timer.delay().as_millis(), new_config.tick_ms);
            self.timer.set_delay(new_config.tick_ms);
        }
        if new_config.model_scale != self.config.model_scale {
            info!("model scale {} -> {}", self.config.model_scale, new_config.model_scale);
            self.compositor.set_model_scale(new_config.model_scale);
        }
        if new_config.plasma != self.config.plasma || new_config.model != self.config.model {
            warn!("plasma/model layers are fixed at startup; restart to apply");
        }

        let (old_ink, old_paper) = (self.config.ink_color.clone(), self.config.paper_color.clone());
        let layers = (self.config.plasma, self.config.model);
        self.config = new_config;
        (self.config.plasma, self.config.model) = layers;

        if self.config.ink_color != old_ink || self.config.paper_color != old_paper {
            let (ink, paper) = self.palette();
            display.set_palette(ink, paper);
        }
    }
}

// Buttons are subscribed but intentionally do nothing
fn on_button(button: Button) {
    trace!("button {:?} pressed", button);
}
