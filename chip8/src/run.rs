use std::cmp::min;
use std::fs;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{debug, error, info};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;

use chip8vm::Chip8;
use display::Display;

use crate::config::Config;
use crate::keymap::keymap;

/// What a key event asks the host to do
enum Input {
    Quit,
    Key(u8, bool),
    FastForward(bool),
    Ignored,
}

fn translate(event: Event) -> Input {
    match event {
        Event::Quit { .. } => Input::Quit,
        Event::KeyDown {
            keycode: Some(key),
            repeat: false,
            ..
        } => match keymap(key) {
            Some(code) => Input::Key(code, true),
            None if key == Keycode::Escape => Input::Quit,
            None if key == Keycode::Space => Input::FastForward(true),
            None => Input::Ignored,
        },
        Event::KeyUp {
            keycode: Some(key), ..
        } => match keymap(key) {
            Some(code) => Input::Key(code, false),
            None if key == Keycode::Space => Input::FastForward(false),
            None => Input::Ignored,
        },
        _ => Input::Ignored,
    }
}

pub fn run(config: &Config) -> Result<()> {
    // Load ROM
    let rom = fs::read(&config.rom)
        .with_context(|| format!("unable to read ROM {}", config.rom.display()))?;
    let mut chip8 = Chip8::new();
    chip8
        .load_rom(&rom)
        .with_context(|| format!("unable to load ROM {}", config.rom.display()))?;
    info!("loaded {} ({} bytes)", config.rom.display(), rom.len());

    // Get SDL2 context
    let sdl = sdl2::init().map_err(anyhow::Error::msg)?;
    let mut display = Display::new(&sdl, config.scale)?;
    let mut events = sdl.event_pump().map_err(anyhow::Error::msg)?;

    // Set initial timing; the CPU and the timers each keep their own schedule
    let cycle_time = config.cycle_time();
    let timer_time = config.timer_time();
    let mut last_cycle = Instant::now();
    let mut last_tick = last_cycle;

    // Whether or not the configured clock speed should be respected
    let mut fast_forward = false;

    'event: loop {
        // Handle input
        for event in events.poll_iter() {
            match translate(event) {
                Input::Quit => break 'event,
                Input::Key(code, pressed) => {
                    if pressed {
                        chip8.key_press(code)?;
                    } else {
                        chip8.key_release(code)?;
                    }
                }
                Input::FastForward(enabled) => fast_forward = enabled,
                Input::Ignored => continue,
            }
        }

        // Update state
        let now = Instant::now();
        if chip8.fault().is_none() && (fast_forward || now - last_cycle >= cycle_time) {
            if let Err(e) = chip8.step() {
                if e.is_fatal() {
                    error!("program halted: {}", e);
                } else {
                    debug!("continuing past: {}", e);
                }
            }
            last_cycle = now;
        }
        if now - last_tick >= timer_time {
            chip8.tick();
            last_tick = now;
        }

        // Render the frame if the program changed it
        if let Some(frame) = chip8.take_frame() {
            display.render(&frame)?;
        }

        // Handle timing
        if !fast_forward {
            let next_tick = last_tick + timer_time;
            let next_deadline = match chip8.fault() {
                Some(_) => next_tick,
                None => min(last_cycle + cycle_time, next_tick),
            };
            if let Some(wait) = next_deadline.checked_duration_since(Instant::now()) {
                std::thread::sleep(wait);
            }
        }
    }

    Ok(())
}
