use crate::error::CollageError;

/// Most grid units (`cols × rows`) a layout may declare.
pub const MAX_GRID_CELLS: usize = 1 << 16;

/// Where one logical cell sits in the grid (0-indexed, row 0 at the top).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CellPlacement {
    /// Cell-store key whose image fills this placement.
    pub key: String,
    /// Top row.
    pub row: u32,
    /// Left column.
    pub col: u32,
    /// Rows covered, at least 1.
    #[cfg_attr(feature = "serde", serde(default = "one"))]
    pub row_span: u32,
    /// Columns covered, at least 1.
    #[cfg_attr(feature = "serde", serde(default = "one"))]
    pub col_span: u32,
}

#[cfg(feature = "serde")]
fn one() -> u32 {
    1
}

impl CellPlacement {
    /// A single-cell placement.
    pub fn new(key: impl Into<String>, row: u32, col: u32) -> Self {
        Self::spanning(key, row, col, 1, 1)
    }

    /// A placement covering `row_span × col_span` grid units.
    pub fn spanning(key: impl Into<String>, row: u32, col: u32, row_span: u32, col_span: u32) -> Self {
        Self {
            key: key.into(),
            row,
            col,
            row_span,
            col_span,
        }
    }

    fn last_row(&self) -> u64 {
        self.row as u64 + self.row_span as u64
    }

    fn last_col(&self) -> u64 {
        self.col as u64 + self.col_span as u64
    }
}

/// Target print size for print-oriented layouts.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PhysicalSize {
    /// Sheet width in inches.
    pub width_in: f64,
    /// Sheet height in inches.
    pub height_in: f64,
    /// Output resolution in dots per inch.
    pub dpi: f64,
}

/// How logical grid units map to pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sizing {
    /// Every grid unit is this many logical pixels square; the export scale
    /// multiplies on top.
    CellBase(f64),
    /// The sheet is `width_in × dpi` pixels wide; the width axis decides the
    /// cell size.
    Physical(PhysicalSize),
}

/// Device-pixel rectangle a cell image is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in device pixels.
    pub width: u32,
    /// Height in device pixels.
    pub height: u32,
}

impl DestRect {
    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Whether the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the two rectangles share at least one pixel.
    pub fn intersects(&self, other: &DestRect) -> bool {
        self.x < other.right() && other.x < self.right() && self.y < other.bottom() && other.y < self.bottom()
    }
}

/// Declarative description of one collage template's grid.
///
/// Built through [`LayoutDescriptor::builder`], which validates that
/// placements stay inside the grid and never overlap. Immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "LayoutSpec"))]
pub struct LayoutDescriptor {
    cols: u32,
    rows: u32,
    sizing: Sizing,
    gap_px: f64,
    placements: Vec<CellPlacement>,
}

impl LayoutDescriptor {
    /// Start a `cols × rows` layout.
    pub fn builder(cols: u32, rows: u32) -> LayoutBuilder {
        LayoutBuilder {
            cols,
            rows,
            sizing: None,
            gap_px: 0.0,
            placements: Vec::new(),
        }
    }

    /// Assemble a descriptor without validation. Callers must run
    /// [`LayoutDescriptor::validate`] before handing it out.
    pub(crate) fn from_parts(
        cols: u32,
        rows: u32,
        sizing: Sizing,
        gap_px: f64,
        placements: Vec<CellPlacement>,
    ) -> Self {
        Self {
            cols,
            rows,
            sizing,
            gap_px,
            placements,
        }
    }

    /// Grid columns.
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Grid rows.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// How grid units map to pixels.
    pub fn sizing(&self) -> Sizing {
        self.sizing
    }

    /// Gutter between neighbouring cells, in logical pixels.
    pub fn gap_px(&self) -> f64 {
        self.gap_px
    }

    /// Placements in declaration order.
    pub fn placements(&self) -> &[CellPlacement] {
        &self.placements
    }

    /// Placement with cell key `key`.
    pub fn placement(&self, key: &str) -> Option<&CellPlacement> {
        self.placements.iter().find(|p| p.key == key)
    }

    /// Logical size of a grid unit for screen layouts.
    pub fn cell_base_px(&self) -> Option<f64> {
        match self.sizing {
            Sizing::CellBase(px) => Some(px),
            Sizing::Physical(_) => None,
        }
    }

    /// Sheet size for print layouts.
    pub fn target_physical(&self) -> Option<PhysicalSize> {
        match self.sizing {
            Sizing::Physical(size) => Some(size),
            Sizing::CellBase(_) => None,
        }
    }

    /// Whether pixel dimensions come from a print size and DPI.
    pub fn is_print(&self) -> bool {
        matches!(self.sizing, Sizing::Physical(_))
    }

    /// Side length of one grid unit in logical pixels.
    pub fn effective_cell_px(&self) -> f64 {
        match self.sizing {
            Sizing::CellBase(px) => px,
            Sizing::Physical(size) => size.width_in * size.dpi / self.cols as f64,
        }
    }

    /// Unscaled canvas size in logical pixels.
    pub fn logical_size(&self) -> (f64, f64) {
        let cell = self.effective_cell_px();
        (cell * self.cols as f64, cell * self.rows as f64)
    }

    /// Canvas size in device pixels at `scale`.
    pub fn surface_size(&self, scale: f64) -> (u32, u32) {
        let (width, height) = self.logical_size();
        (to_device(width * scale), to_device(height * scale))
    }

    /// Device-pixel rectangle for `placement` at `scale`.
    ///
    /// Interior edges give up half the gap each, so neighbours end up exactly
    /// `gap_px` apart. Edges on the grid boundary give up nothing. Each edge
    /// is rounded on its own so that adjacent cells share integer boundaries.
    pub fn dest_rect(&self, placement: &CellPlacement, scale: f64) -> DestRect {
        let cell = self.effective_cell_px();
        let half_gap = self.gap_px / 2.0;

        let end_col = placement.col.saturating_add(placement.col_span);
        let end_row = placement.row.saturating_add(placement.row_span);

        let left_gap = if placement.col == 0 { 0.0 } else { half_gap };
        let right_gap = if end_col >= self.cols { 0.0 } else { half_gap };
        let top_gap = if placement.row == 0 { 0.0 } else { half_gap };
        let bottom_gap = if end_row >= self.rows { 0.0 } else { half_gap };

        let left = to_device((placement.col as f64 * cell + left_gap) * scale);
        let right = to_device((end_col as f64 * cell - right_gap) * scale);
        let top = to_device((placement.row as f64 * cell + top_gap) * scale);
        let bottom = to_device((end_row as f64 * cell - bottom_gap) * scale);

        DestRect {
            x: left,
            y: top,
            width: right.saturating_sub(left),
            height: bottom.saturating_sub(top),
        }
    }

    /// Check grid bounds, spans, sizing and placement overlap.
    pub fn validate(&self) -> Result<(), CollageError> {
        if self.cols == 0 || self.rows == 0 {
            return Err(CollageError::InvalidGeometry(format!(
                "grid must have at least one row and column, got {}x{}",
                self.cols, self.rows
            )));
        }

        match self.sizing {
            Sizing::CellBase(px) if !(px.is_finite() && px > 0.0) => {
                return Err(CollageError::InvalidGeometry(format!(
                    "cell base size must be positive, got {px}"
                )));
            }
            Sizing::Physical(size)
                if !(size.width_in.is_finite()
                    && size.width_in > 0.0
                    && size.height_in.is_finite()
                    && size.height_in > 0.0
                    && size.dpi.is_finite()
                    && size.dpi > 0.0) =>
            {
                return Err(CollageError::InvalidGeometry(format!(
                    "print size must be positive, got {}x{} in at {} dpi",
                    size.width_in, size.height_in, size.dpi
                )));
            }
            _ => {}
        }

        if !(self.gap_px.is_finite() && self.gap_px >= 0.0) || self.gap_px >= self.effective_cell_px() {
            return Err(CollageError::InvalidGeometry(format!(
                "gap must be non-negative and smaller than a cell, got {}",
                self.gap_px
            )));
        }

        let cell_count = (self.rows as usize)
            .checked_mul(self.cols as usize)
            .filter(|&count| count <= MAX_GRID_CELLS)
            .ok_or_else(|| {
                CollageError::InvalidGeometry(format!(
                    "grid of {}x{} exceeds {MAX_GRID_CELLS} cells",
                    self.cols, self.rows
                ))
            })?;

        let mut occupied: Vec<Option<usize>> = vec![None; cell_count];
        for (index, placement) in self.placements.iter().enumerate() {
            if placement.row_span == 0 || placement.col_span == 0 {
                return Err(CollageError::EmptySpan {
                    key: placement.key.clone(),
                });
            }
            if placement.last_row() > self.rows as u64 || placement.last_col() > self.cols as u64 {
                return Err(CollageError::OutOfBounds {
                    key: placement.key.clone(),
                });
            }
            if self.placements[..index].iter().any(|p| p.key == placement.key) {
                return Err(CollageError::InvalidGeometry(format!(
                    "placement key {} is used twice",
                    placement.key
                )));
            }

            for row in placement.row..placement.row + placement.row_span {
                for col in placement.col..placement.col + placement.col_span {
                    let slot = &mut occupied[row as usize * self.cols as usize + col as usize];
                    if let Some(previous) = *slot {
                        return Err(CollageError::OverlappingPlacement {
                            first: self.placements[previous].key.clone(),
                            second: placement.key.clone(),
                        });
                    }
                    *slot = Some(index);
                }
            }
        }

        Ok(())
    }
}

fn to_device(value: f64) -> u32 {
    // `as` saturates: negatives and NaN become 0, huge values u32::MAX.
    value.round() as u32
}

/// Builder for [`LayoutDescriptor`].
#[derive(Debug, Clone)]
pub struct LayoutBuilder {
    cols: u32,
    rows: u32,
    sizing: Option<Sizing>,
    gap_px: f64,
    placements: Vec<CellPlacement>,
}

impl LayoutBuilder {
    /// Size every grid unit at `px` logical pixels (screen-oriented layouts).
    pub fn cell_base_px(mut self, px: f64) -> Self {
        self.sizing = Some(Sizing::CellBase(px));
        self
    }

    /// Size the sheet for print at `dpi`.
    pub fn print(mut self, width_in: f64, height_in: f64, dpi: f64) -> Self {
        self.sizing = Some(Sizing::Physical(PhysicalSize {
            width_in,
            height_in,
            dpi,
        }));
        self
    }

    /// Spacing between adjacent cells, in logical pixels (default: 0).
    pub fn gap_px(mut self, gap: f64) -> Self {
        self.gap_px = gap;
        self
    }

    /// Place a 1×1 cell.
    pub fn place(self, key: impl Into<String>, row: u32, col: u32) -> Self {
        self.place_span(key, row, col, 1, 1)
    }

    /// Place a cell covering `row_span × col_span` grid units.
    pub fn place_span(mut self, key: impl Into<String>, row: u32, col: u32, row_span: u32, col_span: u32) -> Self {
        self.placements
            .push(CellPlacement::spanning(key, row, col, row_span, col_span));
        self
    }

    /// Place a 1×1 cell at every grid position, keyed by `key_for(row, col)`.
    pub fn fill(mut self, key_for: impl Fn(u32, u32) -> String) -> Self {
        for row in 0..self.rows {
            for col in 0..self.cols {
                self.placements.push(CellPlacement::new(key_for(row, col), row, col));
            }
        }
        self
    }

    /// Validate and finish the layout.
    pub fn build(self) -> Result<LayoutDescriptor, CollageError> {
        let sizing = self.sizing.ok_or_else(|| {
            CollageError::InvalidGeometry("layout needs either a cell base size or a print size".into())
        })?;
        let layout = LayoutDescriptor::from_parts(self.cols, self.rows, sizing, self.gap_px, self.placements);
        layout.validate()?;
        Ok(layout)
    }
}

/// Wire shape of a layout descriptor, validated on conversion.
#[cfg(feature = "serde")]
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutSpec {
    cols: u32,
    rows: u32,
    #[serde(default)]
    cell_base_px: Option<f64>,
    #[serde(default)]
    target_physical: Option<PhysicalSize>,
    #[serde(default)]
    gap_px: f64,
    placements: Vec<CellPlacement>,
}

#[cfg(feature = "serde")]
impl TryFrom<LayoutSpec> for LayoutDescriptor {
    type Error = CollageError;

    fn try_from(spec: LayoutSpec) -> Result<Self, Self::Error> {
        let sizing = match (spec.cell_base_px, spec.target_physical) {
            (Some(px), None) => Sizing::CellBase(px),
            (None, Some(size)) => Sizing::Physical(size),
            _ => {
                return Err(CollageError::InvalidGeometry(
                    "exactly one of cellBasePx or targetPhysical must be set".into(),
                ))
            }
        };
        let layout = LayoutDescriptor::from_parts(spec.cols, spec.rows, sizing, spec.gap_px, spec.placements);
        layout.validate()?;
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(cols: u32, rows: u32, cell: f64, gap: f64) -> LayoutDescriptor {
        LayoutDescriptor::builder(cols, rows)
            .cell_base_px(cell)
            .gap_px(gap)
            .fill(|r, c| format!("r{r}c{c}"))
            .build()
            .unwrap()
    }

    #[test]
    fn corner_cell_has_no_outer_margin() {
        let layout = grid(3, 3, 100.0, 4.0);
        let rect = layout.dest_rect(layout.placement("r0c0").unwrap(), 1.0);
        assert_eq!(
            rect,
            DestRect {
                x: 0,
                y: 0,
                width: 98,
                height: 98
            }
        );
    }

    #[test]
    fn far_corner_touches_surface_edge() {
        let layout = grid(3, 3, 100.0, 4.0);
        let rect = layout.dest_rect(layout.placement("r2c2").unwrap(), 1.0);
        assert_eq!((rect.x, rect.y), (202, 202));
        assert_eq!((rect.right(), rect.bottom()), layout.surface_size(1.0));
    }

    #[test]
    fn center_cell_gives_up_half_gap_on_every_side() {
        let layout = grid(3, 3, 100.0, 4.0);
        let rect = layout.dest_rect(layout.placement("r1c1").unwrap(), 1.0);
        assert_eq!(
            rect,
            DestRect {
                x: 102,
                y: 102,
                width: 96,
                height: 96
            }
        );
    }

    #[test]
    fn neighbours_are_exactly_one_gap_apart() {
        let layout = grid(3, 3, 100.0, 4.0);
        let left = layout.dest_rect(layout.placement("r1c0").unwrap(), 2.0);
        let right = layout.dest_rect(layout.placement("r1c1").unwrap(), 2.0);
        assert_eq!(right.x - left.right(), 8);
    }

    #[test]
    fn spanning_cell_covers_its_units() {
        let layout = LayoutDescriptor::builder(3, 3)
            .cell_base_px(100.0)
            .gap_px(4.0)
            .place_span("hero", 0, 0, 2, 2)
            .place("side", 0, 2)
            .build()
            .unwrap();
        let hero = layout.dest_rect(layout.placement("hero").unwrap(), 1.0);
        assert_eq!(
            hero,
            DestRect {
                x: 0,
                y: 0,
                width: 198,
                height: 198
            }
        );
    }

    #[test]
    fn surface_size_scales() {
        let layout = grid(2, 3, 150.0, 0.0);
        assert_eq!(layout.surface_size(1.0), (300, 450));
        assert_eq!(layout.surface_size(2.0), (600, 900));
    }

    #[test]
    fn print_sizing_uses_width_axis() {
        let layout = LayoutDescriptor::builder(2, 3)
            .print(4.0, 6.0, 300.0)
            .fill(|r, c| format!("{r}-{c}"))
            .build()
            .unwrap();
        assert!(layout.is_print());
        assert_eq!(layout.effective_cell_px(), 600.0);
        assert_eq!(layout.surface_size(1.0), (1200, 1800));
    }

    #[test]
    fn overlapping_placements_rejected() {
        let result = LayoutDescriptor::builder(3, 3)
            .cell_base_px(100.0)
            .place_span("a", 0, 0, 2, 2)
            .place("b", 1, 1)
            .build();
        match result {
            Err(CollageError::OverlappingPlacement { first, second }) => {
                assert_eq!(first, "a");
                assert_eq!(second, "b");
            }
            other => panic!("expected overlap error, got {other:?}"),
        }
    }

    #[test]
    fn out_of_bounds_span_rejected() {
        let result = LayoutDescriptor::builder(2, 2)
            .cell_base_px(100.0)
            .place_span("wide", 0, 1, 1, 2)
            .build();
        assert!(matches!(result, Err(CollageError::OutOfBounds { key }) if key == "wide"));
    }

    #[test]
    fn oversized_grid_rejected_before_allocating() {
        let result = LayoutDescriptor::builder(u32::MAX, u32::MAX)
            .cell_base_px(1.0)
            .place("a", 0, 0)
            .build();
        assert!(matches!(result, Err(CollageError::InvalidGeometry(_))));

        let result = LayoutDescriptor::builder(300, 300).cell_base_px(1.0).build();
        assert!(matches!(result, Err(CollageError::InvalidGeometry(_))));

        assert!(LayoutDescriptor::builder(256, 256).cell_base_px(1.0).build().is_ok());
    }

    #[test]
    fn zero_span_rejected() {
        let result = LayoutDescriptor::builder(2, 2)
            .cell_base_px(100.0)
            .place_span("flat", 0, 0, 0, 1)
            .build();
        assert!(matches!(result, Err(CollageError::EmptySpan { .. })));
    }

    #[test]
    fn missing_sizing_rejected() {
        let result = LayoutDescriptor::builder(2, 2).place("a", 0, 0).build();
        assert!(matches!(result, Err(CollageError::InvalidGeometry(_))));
    }

    #[test]
    fn gap_wider_than_cell_rejected() {
        let result = LayoutDescriptor::builder(2, 2).cell_base_px(10.0).gap_px(10.0).build();
        assert!(matches!(result, Err(CollageError::InvalidGeometry(_))));
    }

    #[test]
    fn duplicate_keys_rejected() {
        let result = LayoutDescriptor::builder(2, 1)
            .cell_base_px(10.0)
            .place("same", 0, 0)
            .place("same", 0, 1)
            .build();
        assert!(matches!(result, Err(CollageError::InvalidGeometry(_))));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_and_validates() {
        let layout: LayoutDescriptor = serde_json::from_str(
            r#"{"cols":2,"rows":1,"cellBasePx":100,"gapPx":4,
                "placements":[{"key":"l","row":0,"col":0},{"key":"r","row":0,"col":1}]}"#,
        )
        .unwrap();
        assert_eq!(layout.placements().len(), 2);
        assert_eq!(layout.placements()[1].col_span, 1);

        let overlapping = serde_json::from_str::<LayoutDescriptor>(
            r#"{"cols":2,"rows":1,"cellBasePx":100,
                "placements":[{"key":"l","row":0,"col":0,"colSpan":2},{"key":"r","row":0,"col":1}]}"#,
        );
        assert!(overlapping.is_err());

        let both_sizes = serde_json::from_str::<LayoutDescriptor>(
            r#"{"cols":1,"rows":1,"cellBasePx":100,
                "targetPhysical":{"widthIn":1,"heightIn":1,"dpi":300},"placements":[]}"#,
        );
        assert!(both_sizes.is_err());
    }
}
