//! Half-block terminal renderer
//!
//! Each terminal cell shows two vertically stacked pixels using the upper
//! half block glyph (foreground = top pixel, background = bottom pixel).
//! The 288x512 playfield is scaled uniformly into the pixel buffer and
//! letterboxed.

use std::io::{self, Stdout, Write, stdout};

use crossterm::{
    cursor, queue,
    style::{self, Color},
    terminal,
};

use super::Renderer;
use crate::consts::*;
use crate::session::Session;
use crate::sim::{GamePhase, GameState, PlayerMode, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Blend towards `other`; `t` in 0..=256
    pub fn lerp(self, other: Rgb, t: u16) -> Rgb {
        let t = t as i32;
        let mix = |a: u8, b: u8| (a as i32 + (b as i32 - a as i32) * t / 256) as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }

    pub const fn dim(self) -> Rgb {
        Rgb(self.0 / 2, self.1 / 2, self.2 / 2)
    }

    fn color(self) -> Color {
        Color::Rgb {
            r: self.0,
            g: self.1,
            b: self.2,
        }
    }
}

const LETTERBOX: Rgb = Rgb(12, 12, 16);
const SKY_TOP: Rgb = Rgb(78, 192, 202);
const SKY_BOTTOM: Rgb = Rgb(200, 236, 240);
const HILL: Rgb = Rgb(100, 184, 64);
const GRASS: Rgb = Rgb(92, 176, 48);
const GRASS_LIGHT: Rgb = Rgb(124, 210, 72);
const DIRT: Rgb = Rgb(222, 216, 148);
const DIRT_DARK: Rgb = Rgb(200, 190, 120);
const PIPE_DARK: Rgb = Rgb(68, 116, 24);
const PIPE_LIGHT: Rgb = Rgb(150, 220, 70);
const PIPE_RIM: Rgb = Rgb(52, 92, 16);
const BIRD_BODY: Rgb = Rgb(248, 196, 56);
const BIRD_HIGHLIGHT: Rgb = Rgb(255, 230, 110);
const BIRD_WING: Rgb = Rgb(236, 160, 40);
const BIRD_EYE: Rgb = Rgb(255, 255, 255);
const BIRD_PUPIL: Rgb = Rgb(16, 16, 16);
const BIRD_BEAK: Rgb = Rgb(232, 88, 40);
const TEXT: Rgb = Rgb(255, 255, 255);
const TEXT_SHADOW: Rgb = Rgb(40, 40, 40);
const PANEL: Rgb = Rgb(222, 216, 148);
const PANEL_EDGE: Rgb = Rgb(84, 56, 70);

/// Pixel buffer, two pixels per terminal row
pub struct PixelBuf {
    w: usize,
    h: usize,
    px: Vec<Rgb>,
}

impl PixelBuf {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            px: vec![LETTERBOX; w * h],
        }
    }

    /// Buffer covering a terminal of `cols` x `rows` cells
    pub fn for_terminal(cols: u16, rows: u16) -> Self {
        Self::new(cols as usize, rows as usize * 2)
    }

    pub fn resize(&mut self, w: usize, h: usize) {
        self.w = w;
        self.h = h;
        self.px.resize(w * h, LETTERBOX);
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    pub fn clear(&mut self, c: Rgb) {
        self.px.fill(c);
    }

    /// Out-of-range writes are clipped
    pub fn set(&mut self, x: i32, y: i32, c: Rgb) {
        if x >= 0 && y >= 0 && (x as usize) < self.w && (y as usize) < self.h {
            self.px[y as usize * self.w + x as usize] = c;
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Rgb> {
        (x < self.w && y < self.h).then(|| self.px[y * self.w + x])
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, c: Rgb) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(self.w as i32);
        let y1 = (y + h).min(self.h as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                self.px[py as usize * self.w + px as usize] = c;
            }
        }
    }

    /// Halve the brightness of every pixel
    pub fn dim(&mut self) {
        for p in &mut self.px {
            *p = p.dim();
        }
    }

    /// Queue the buffer as half-block cells and flush
    pub fn encode(&self, out: &mut impl Write) -> io::Result<()> {
        queue!(out, cursor::MoveTo(0, 0))?;
        let rows = self.h / 2;
        for row in 0..rows {
            // Colors are reset at every line break, so the pen starts empty
            let mut fg: Option<Rgb> = None;
            let mut bg: Option<Rgb> = None;
            for col in 0..self.w {
                let top = self.px[row * 2 * self.w + col];
                let bottom = self.px[(row * 2 + 1) * self.w + col];
                if bg != Some(bottom) {
                    queue!(out, style::SetBackgroundColor(bottom.color()))?;
                    bg = Some(bottom);
                }
                if top == bottom {
                    queue!(out, style::Print(' '))?;
                    continue;
                }
                if fg != Some(top) {
                    queue!(out, style::SetForegroundColor(top.color()))?;
                    fg = Some(top);
                }
                queue!(out, style::Print('\u{2580}'))?;
            }
            queue!(out, style::ResetColor)?;
            if row + 1 < rows {
                queue!(out, style::Print("\r\n"))?;
            }
        }
        out.flush()
    }
}

/// Playfield to pixel mapping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub origin_x: f32,
    pub origin_y: f32,
}

impl Viewport {
    /// Largest uniform scale that fits the playfield, centered
    pub fn fit(w: usize, h: usize) -> Self {
        let scale = (w as f32 / WINDOW_WIDTH).min(h as f32 / WINDOW_HEIGHT);
        Self {
            scale,
            origin_x: ((w as f32 - WINDOW_WIDTH * scale) / 2.0).floor(),
            origin_y: ((h as f32 - WINDOW_HEIGHT * scale) / 2.0).floor(),
        }
    }

    pub fn x(&self, x: f32) -> i32 {
        (self.origin_x + x * self.scale).floor() as i32
    }

    pub fn y(&self, y: f32) -> i32 {
        (self.origin_y + y * self.scale).floor() as i32
    }

    /// Pixel rectangle (x, y, w, h), never thinner than one pixel
    pub fn rect(&self, r: &Rect) -> (i32, i32, i32, i32) {
        let max = r.max();
        let x = self.x(r.min.x);
        let y = self.y(r.min.y);
        (x, y, (self.x(max.x) - x).max(1), (self.y(max.y) - y).max(1))
    }

    /// Size in pixels of a playfield length
    pub fn span(&self, l: f32) -> i32 {
        ((l * self.scale).round() as i32).max(1)
    }
}

/// Draw one frame of a round
pub fn draw_scene(buf: &mut PixelBuf, state: &GameState, best: u32) {
    let vp = Viewport::fit(buf.width(), buf.height());
    buf.clear(LETTERBOX);

    draw_sky(buf, &vp, state);
    for obstacle in &state.obstacles {
        draw_pipe(buf, &vp, &obstacle.upper_bounds(), true);
        draw_pipe(buf, &vp, &obstacle.lower_bounds(), false);
    }
    draw_floor(buf, &vp, state);
    draw_player(buf, &vp, state);
    mask_letterbox(buf, &vp);

    let glyph = glyph_scale(&vp);
    match state.phase {
        GamePhase::Splash => draw_title(buf, &vp, best),
        GamePhase::Play => {
            draw_number(buf, vp.x(WINDOW_WIDTH / 2.0), vp.y(24.0), state.score.value(), glyph)
        }
        GamePhase::GameOver => {
            let resting =
                state.player.mode == PlayerMode::Crashed && state.player.on_floor(&state.floor);
            if resting {
                draw_game_over(buf, &vp, state.score.value(), best);
            } else {
                draw_number(buf, vp.x(WINDOW_WIDTH / 2.0), vp.y(24.0), state.score.value(), glyph);
            }
        }
    }
}

fn draw_sky(buf: &mut PixelBuf, vp: &Viewport, state: &GameState) {
    let (x0, x1) = (vp.x(0.0), vp.x(WINDOW_WIDTH));
    let (y0, y1) = (vp.y(0.0), vp.y(FLOOR_Y));
    let span = (y1 - y0).max(1);
    for y in y0..y1 {
        let c = SKY_TOP.lerp(SKY_BOTTOM, ((y - y0) * 256 / span) as u16);
        buf.fill_rect(x0, y, x1 - x0, 1, c);
    }

    // Rolling hills behind the pipes, scrolled slowly
    let hill_h = 40.0;
    for x in x0..x1 {
        let wx = (x - x0) as f32 / vp.scale + state.background.offset;
        let h = hill_h * 0.5 * (1.0 + (wx * 0.035).sin() * 0.6 + (wx * 0.09).sin() * 0.4);
        let top = vp.y(FLOOR_Y - h);
        buf.fill_rect(x, top, 1, y1 - top, HILL);
    }
}

/// Vertical pipe shading: dark edges, light stripe left of center
fn pipe_shade(col: i32, width: i32) -> Rgb {
    if width <= 2 {
        return PIPE_DARK.lerp(PIPE_LIGHT, 128);
    }
    let t = col * 256 / (width - 1);
    let peak = 96;
    if t <= peak {
        PIPE_DARK.lerp(PIPE_LIGHT, (t * 256 / peak) as u16)
    } else {
        PIPE_LIGHT.lerp(PIPE_DARK, ((t - peak) * 256 / (256 - peak)) as u16)
    }
}

fn draw_pipe(buf: &mut PixelBuf, vp: &Viewport, bounds: &Rect, upper: bool) {
    let (x, y, w, h) = vp.rect(bounds);
    for col in 0..w {
        buf.fill_rect(x + col, y, 1, h, pipe_shade(col, w));
    }

    // Cap at the gap end, a bit wider than the body
    let lip = vp.span(3.0);
    let cap_h = vp.span(24.0).min(h);
    let cap_y = if upper { y + h - cap_h } else { y };
    let cap_w = w + lip * 2;
    for col in 0..cap_w {
        buf.fill_rect(x - lip + col, cap_y, 1, cap_h, pipe_shade(col, cap_w));
    }
    buf.fill_rect(x - lip, cap_y, cap_w, 1, PIPE_RIM);
    buf.fill_rect(x - lip, cap_y + cap_h - 1, cap_w, 1, PIPE_RIM);
}

fn draw_floor(buf: &mut PixelBuf, vp: &Viewport, state: &GameState) {
    let (x0, x1) = (vp.x(0.0), vp.x(WINDOW_WIDTH));
    let (y0, y1) = (vp.y(state.floor.y), vp.y(WINDOW_HEIGHT));
    let grass_h = vp.span(8.0);
    let stripe = (FLOOR_PATTERN_WIDTH / 2.0 * vp.scale).max(1.0);

    for x in x0..x1 {
        let wx = (x - x0) as f32 + state.floor.offset * vp.scale;
        let light = (wx / stripe) as i32 % 2 == 0;
        buf.fill_rect(x, y0, 1, grass_h, if light { GRASS_LIGHT } else { GRASS });
        for y in (y0 + grass_h)..y1 {
            let band = (wx + (y - y0) as f32) / stripe;
            buf.set(x, y, if (band as i32) % 2 == 0 { DIRT } else { DIRT_DARK });
        }
    }
}

fn draw_player(buf: &mut PixelBuf, vp: &Viewport, state: &GameState) {
    let player = &state.player;
    let (x, y, w, h) = vp.rect(&player.bounds());
    let frac = |v: i32, f: f32| (v as f32 * f) as i32;

    buf.fill_rect(x, y, w, h, BIRD_BODY);
    buf.fill_rect(x + frac(w, 0.1), y, frac(w, 0.6), frac(h, 0.25).max(1), BIRD_HIGHLIGHT);

    // Wing flaps through up / middle / down
    let wing_y = y + frac(h, 0.2 + 0.15 * player.wing_frame() as f32);
    buf.fill_rect(x + frac(w, 0.05), wing_y, frac(w, 0.4).max(1), frac(h, 0.3).max(1), BIRD_WING);

    let eye_x = x + frac(w, 0.6);
    let eye_y = y + frac(h, 0.15);
    let eye = frac(w, 0.2).max(1);
    buf.fill_rect(eye_x, eye_y, eye, eye, BIRD_EYE);
    buf.set(eye_x + eye - 1, eye_y + eye / 2, BIRD_PUPIL);

    // The beak tilts with the bird: nose up while rising, down while diving
    let tilt = -(player.visible_rotation() / 90.0 * h as f32 * 0.4) as i32;
    let beak_y = y + frac(h, 0.5) + tilt;
    buf.fill_rect(x + w - frac(w, 0.1), beak_y, frac(w, 0.25).max(1), frac(h, 0.2).max(1), BIRD_BEAK);
}

/// Paint over anything drawn outside the playfield
fn mask_letterbox(buf: &mut PixelBuf, vp: &Viewport) {
    let (w, h) = (buf.width() as i32, buf.height() as i32);
    let (x0, x1) = (vp.x(0.0), vp.x(WINDOW_WIDTH));
    let (y0, y1) = (vp.y(0.0), vp.y(WINDOW_HEIGHT));
    buf.fill_rect(0, 0, x0, h, LETTERBOX);
    buf.fill_rect(x1, 0, w - x1, h, LETTERBOX);
    buf.fill_rect(0, 0, w, y0, LETTERBOX);
    buf.fill_rect(0, y1, w, h - y1, LETTERBOX);
}

#[rustfmt::skip]
const DIGITS: [[u8; 15]; 10] = [
    [1,1,1, 1,0,1, 1,0,1, 1,0,1, 1,1,1],
    [0,1,0, 1,1,0, 0,1,0, 0,1,0, 1,1,1],
    [1,1,1, 0,0,1, 1,1,1, 1,0,0, 1,1,1],
    [1,1,1, 0,0,1, 0,1,1, 0,0,1, 1,1,1],
    [1,0,1, 1,0,1, 1,1,1, 0,0,1, 0,0,1],
    [1,1,1, 1,0,0, 1,1,1, 0,0,1, 1,1,1],
    [1,1,1, 1,0,0, 1,1,1, 1,0,1, 1,1,1],
    [1,1,1, 0,0,1, 0,1,0, 0,1,0, 0,1,0],
    [1,1,1, 1,0,1, 1,1,1, 1,0,1, 1,1,1],
    [1,1,1, 1,0,1, 1,1,1, 0,0,1, 1,1,1],
];

/// Pixels per glyph dot
fn glyph_scale(vp: &Viewport) -> i32 {
    ((vp.scale * 6.0).round() as i32).max(1)
}

/// Draw `n` centered on `cx` with its top at `y`
fn draw_number(buf: &mut PixelBuf, cx: i32, y: i32, n: u32, dot: i32) {
    let digits = n.to_string();
    let advance = 4 * dot;
    let width = digits.len() as i32 * advance - dot;
    let left = cx - width / 2;

    for (pass, color) in [(dot.min(2), TEXT_SHADOW), (0, TEXT)] {
        for (i, ch) in digits.bytes().enumerate() {
            let glyph = &DIGITS[(ch - b'0') as usize];
            let gx = left + i as i32 * advance + pass;
            for (k, on) in glyph.iter().enumerate() {
                if *on == 1 {
                    let col = (k % 3) as i32;
                    let row = (k / 3) as i32;
                    buf.fill_rect(gx + col * dot, y + pass + row * dot, dot, dot, color);
                }
            }
        }
    }
}

fn draw_title(buf: &mut PixelBuf, vp: &Viewport, best: u32) {
    // Banner of blocks where a title would go, plus a pulsing tap hint
    let cx = vp.x(WINDOW_WIDTH / 2.0);
    let block = vp.span(22.0);
    let gap = vp.span(4.0);
    let letters = 6;
    let total = letters * (block + gap) - gap;
    let top = vp.y(96.0);
    for i in 0..letters {
        let bx = cx - total / 2 + i * (block + gap);
        buf.fill_rect(bx, top, block, block + gap, BIRD_BODY);
        buf.fill_rect(bx, top, block, 1, BIRD_HIGHLIGHT);
    }

    let hint = vp.span(10.0);
    buf.fill_rect(cx - hint / 2, vp.y(330.0), hint, hint, TEXT);

    if best > 0 {
        draw_number(buf, cx, vp.y(150.0), best, glyph_scale(vp));
    }
}

fn draw_game_over(buf: &mut PixelBuf, vp: &Viewport, score: u32, best: u32) {
    buf.dim();

    let panel = Rect::new(WINDOW_WIDTH * 0.15, 150.0, WINDOW_WIDTH * 0.7, 140.0);
    let (x, y, w, h) = vp.rect(&panel);
    buf.fill_rect(x - 1, y - 1, w + 2, h + 2, PANEL_EDGE);
    buf.fill_rect(x, y, w, h, PANEL);

    let dot = glyph_scale(vp);
    let cx = x + w / 2;
    draw_number(buf, cx, vp.y(170.0), score, dot);
    draw_number(buf, cx, vp.y(230.0), best, dot);
}

/// Renders a session into a terminal (or any writer)
pub struct TerminalRenderer<W: Write> {
    out: W,
    buf: PixelBuf,
    /// Re-query the terminal size every frame
    follow_terminal: bool,
    frames: u64,
}

impl TerminalRenderer<Stdout> {
    /// Renderer on stdout that follows terminal resizes
    pub fn stdout() -> io::Result<Self> {
        let (cols, rows) = terminal::size()?;
        log::info!("Terminal {}x{} cells", cols, rows);
        let mut renderer = Self::new(stdout(), cols, rows);
        renderer.follow_terminal = true;
        Ok(renderer)
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, cols: u16, rows: u16) -> Self {
        Self {
            out,
            buf: PixelBuf::for_terminal(cols, rows),
            follow_terminal: false,
            frames: 0,
        }
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        let (w, h) = (cols as usize, rows as usize * 2);
        if (w, h) != (self.buf.width(), self.buf.height()) {
            log::debug!("Resize to {}x{} cells", cols, rows);
            self.buf.resize(w, h);
        }
    }

    /// Frames presented so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn buffer(&self) -> &PixelBuf {
        &self.buf
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn present(&mut self, session: &Session) -> io::Result<()> {
        if self.follow_terminal {
            let (cols, rows) = terminal::size()?;
            self.resize(cols, rows);
        }
        draw_scene(&mut self.buf, session.state(), session.best());
        self.buf.encode(&mut self.out)?;
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Obstacle;

    fn full_size() -> PixelBuf {
        PixelBuf::new(WINDOW_WIDTH as usize, WINDOW_HEIGHT as usize)
    }

    #[test]
    fn test_viewport_fits_and_centers() {
        let vp = Viewport::fit(288, 512);
        assert_eq!(vp.scale, 1.0);
        assert_eq!((vp.origin_x, vp.origin_y), (0.0, 0.0));

        // Wide terminal: height limits, playfield centered horizontally
        let vp = Viewport::fit(400, 256);
        assert_eq!(vp.scale, 0.5);
        assert_eq!(vp.origin_x, 128.0);
        assert_eq!(vp.origin_y, 0.0);
        assert_eq!(vp.x(WINDOW_WIDTH), 272);
    }

    #[test]
    fn test_player_is_drawn() {
        let state = GameState::new(3);
        let mut buf = full_size();
        draw_scene(&mut buf, &state, 0);

        let (x, y, w, h) = Viewport::fit(288, 512).rect(&state.player.bounds());
        let center = buf.get((x + w / 2) as usize, (y + h / 2) as usize);
        assert_eq!(center, Some(BIRD_BODY));
    }

    #[test]
    fn test_pipes_are_drawn() {
        let mut state = GameState::new(3);
        state.phase = GamePhase::Play;
        state.obstacles = vec![Obstacle::new(300.0, 200.0)];
        let mut empty = full_size();
        draw_scene(&mut empty, &state, 0);

        state.obstacles = vec![Obstacle::new(150.0, 200.0)];
        let mut piped = full_size();
        draw_scene(&mut piped, &state, 0);

        // Inside the upper pipe body, and inside the gap
        assert_ne!(piped.get(176, 60), empty.get(176, 60));
        assert_eq!(piped.get(176, 200), empty.get(176, 200));
    }

    #[test]
    fn test_letterbox_stays_clear() {
        let state = GameState::new(3);
        let mut buf = PixelBuf::new(400, 256);
        draw_scene(&mut buf, &state, 0);
        assert_eq!(buf.get(0, 100), Some(LETTERBOX));
        assert_eq!(buf.get(399, 100), Some(LETTERBOX));
        assert_ne!(buf.get(200, 100), Some(LETTERBOX));
    }

    #[test]
    fn test_encode_emits_one_line_per_cell_row() {
        let mut buf = PixelBuf::new(4, 6);
        buf.fill_rect(0, 0, 4, 1, TEXT);
        let mut out = Vec::new();
        buf.encode(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("\r\n").count(), 2);
        // Top row differs from the pixel below it: half blocks
        assert_eq!(text.matches('\u{2580}').count(), 4);
    }

    #[test]
    fn test_present_writes_frames() {
        let session = Session::new(1);
        let mut renderer = TerminalRenderer::new(Vec::new(), 40, 20);
        renderer.present(&session).unwrap();
        renderer.present(&session).unwrap();
        assert_eq!(renderer.frames(), 2);
        assert_eq!(renderer.buffer().height(), 40);
        assert!(!renderer.into_inner().is_empty());
    }

    #[test]
    fn test_pipe_shade_edges_are_dark() {
        assert_eq!(pipe_shade(0, 52), PIPE_DARK);
        assert_eq!(pipe_shade(51, 52), PIPE_DARK);
    }
}
