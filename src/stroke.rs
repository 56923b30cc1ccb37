//! Single-stroke vector paths
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{geometry::Bounds, raster::Raster, BitfontError};

/// Kind of stroke path element
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrokeKind {
    /// Move the pen without drawing (`m`)
    Move,
    /// Draw a line to the new position (`l`)
    Line,
}

/// One element of a stroke path: a relative displacement
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrokeMove {
    /// Whether the pen draws
    pub kind: StrokeKind,
    /// Horizontal displacement, rightwards positive
    pub dx: i32,
    /// Vertical displacement, upwards positive
    pub dy: i32,
}

impl StrokeMove {
    /// Create a path element
    pub fn new(kind: StrokeKind, dx: i32, dy: i32) -> Self {
        StrokeMove { kind, dx, dy }
    }
}

impl fmt::Display for StrokeMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let command = match self.kind {
            StrokeKind::Move => 'm',
            StrokeKind::Line => 'l',
        };
        write!(f, "{} {} {}", command, self.dx, self.dy)
    }
}

/// A sequence of pen moves for stroke fonts
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrokePath(Vec<StrokeMove>);

impl StrokePath {
    /// Create a path from its moves
    pub fn new(moves: impl IntoIterator<Item = StrokeMove>) -> Self {
        StrokePath(moves.into_iter().collect())
    }

    /// True if the path has no moves
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The moves of the path
    pub fn moves(&self) -> &[StrokeMove] {
        &self.0
    }

    /// Path elements as an SVG path `d` value
    pub fn as_svg(&self) -> String {
        self.0
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Reflect vertically about the path origin
    pub fn flip(&self) -> StrokePath {
        StrokePath::new(self.0.iter().map(|m| StrokeMove::new(m.kind, m.dx, -m.dy)))
    }

    /// Reflect horizontally about the path origin
    pub fn mirror(&self) -> StrokePath {
        StrokePath::new(self.0.iter().map(|m| StrokeMove::new(m.kind, -m.dx, m.dy)))
    }

    /// Move the start of the path by (x, y)
    pub fn shift(&self, x: i32, y: i32) -> StrokePath {
        let mut moves = self.0.clone();
        match moves.first_mut() {
            None => {}
            Some(first) if first.kind == StrokeKind::Move => {
                first.dx += x;
                first.dy += y;
            }
            Some(_) => moves.insert(0, StrokeMove::new(StrokeKind::Move, x, y)),
        }
        StrokePath(moves)
    }

    /// Box spanned by the pen positions visited, inclusive of the last pixel
    pub fn bounds(&self) -> Bounds {
        if self.0.is_empty() {
            return Bounds::default();
        }
        let positions = self
            .0
            .iter()
            .scan((0, 0), |(x, y), m| {
                *x += m.dx;
                *y += m.dy;
                Some((*x, *y))
            })
            .collect::<Vec<_>>();
        let xs = positions.iter().map(|p| p.0);
        let ys = positions.iter().map(|p| p.1);
        Bounds::new(
            xs.clone().min().unwrap_or(0),
            ys.clone().min().unwrap_or(0),
            xs.max().unwrap_or(0) + 1,
            ys.max().unwrap_or(0) + 1,
        )
    }

    /// Render the path to a raster covering its bounds
    pub fn draw(&self) -> Raster {
        if self.0.is_empty() {
            return Raster::blank(0, 0);
        }
        let bounds = self.bounds();
        let mut canvas = Canvas::blank(bounds.width() as usize, bounds.height() as usize);
        let (mut x, mut y) = (-bounds.left, -bounds.bottom);
        for m in &self.0 {
            if m.kind == StrokeKind::Line {
                canvas.draw_line(x, y, x + m.dx, y + m.dy);
            }
            x += m.dx;
            y += m.dy;
        }
        canvas.into_raster()
    }
}

impl fmt::Display for StrokePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self.0.iter().map(|m| m.to_string()).collect::<Vec<_>>();
        write!(f, "{}", lines.join("\n"))
    }
}

impl FromStr for StrokePath {
    type Err = BitfontError;

    /// Parse triplets of `m|l dx dy`, separated by any whitespace
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let elements = s.split_whitespace().collect::<Vec<_>>();
        if elements.len() % 3 != 0 {
            return Err(BitfontError::invalid("path", s, "expected triplets of `m|l dx dy`"));
        }
        elements
            .chunks(3)
            .map(|triplet| {
                let kind = match triplet[0] {
                    "m" => StrokeKind::Move,
                    "l" => StrokeKind::Line,
                    other => {
                        return Err(BitfontError::invalid(
                            "path",
                            s,
                            format!("unknown command {:?}", other),
                        ))
                    }
                };
                let dx = triplet[1]
                    .parse()
                    .map_err(|_| BitfontError::invalid("path", s, "bad x displacement"))?;
                let dy = triplet[2]
                    .parse()
                    .map_err(|_| BitfontError::invalid("path", s, "bad y displacement"))?;
                Ok(StrokeMove::new(kind, dx, dy))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(StrokePath)
    }
}

/// Mutable drawing surface with the origin at bottom left
struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<Vec<u8>>,
}

impl Canvas {
    fn blank(width: usize, height: usize) -> Self {
        Canvas {
            width,
            height,
            pixels: vec![vec![0; width]; height],
        }
    }

    fn draw_pixel(&mut self, x: i32, y: i32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let row = self.height - y as usize - 1;
        self.pixels[row][x as usize] = 1;
    }

    // Bresenham
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        let (mut x0, mut y0, mut x1, mut y1) = (x0, y0, x1, y1);
        let (mut dx, mut dy) = ((x1 - x0).abs(), (y1 - y0).abs());
        let steep = dy > dx;
        if steep {
            (x0, y0, x1, y1) = (y0, x0, y1, x1);
            (dx, dy) = (dy, dx);
        }
        let sx = if x1 > x0 { 1 } else { -1 };
        let sy = if y1 > y0 { 1 } else { -1 };
        let mut error = dx / 2;
        let mut y = y0;
        let mut x = x0;
        loop {
            if steep {
                self.draw_pixel(y, x);
            } else {
                self.draw_pixel(x, y);
            }
            if x == x1 {
                break;
            }
            error -= dy;
            if error < 0 {
                y += sy;
                error += dx;
            }
            x += sx;
        }
    }

    fn into_raster(self) -> Raster {
        let width = self.width;
        Raster::from_rows(self.pixels).unwrap_or_else(|_| Raster::blank(width, 0))
    }
}
