use crate::error::CollageError;
use crate::layout::{CellPlacement, LayoutDescriptor, PhysicalSize, Sizing};
use crate::store::cell_key;

/// Built-in collage templates.
///
/// Each variant is plain layout data; the same compositor and interactive
/// grid serve all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    /// 2×2 grid of equal squares.
    Grid2x2,

    /// 3×3 grid of equal squares.
    Grid3x3,

    /// Vertical photo-booth strip of four frames.
    Strip4,

    /// 3×3 grid with a 2×2 hero cell top-left, two cells down the right
    /// side and three along the bottom.
    Feature3x3,

    /// One full-height cell on the left, two stacked cells on the right.
    Triptych,

    /// 2×3 grid printed on a 4×6 inch sheet at 300 dpi.
    Print4x6,
}

impl Template {
    /// Every template, in menu order.
    pub const ALL: [Template; 6] = [
        Template::Grid2x2,
        Template::Grid3x3,
        Template::Strip4,
        Template::Feature3x3,
        Template::Triptych,
        Template::Print4x6,
    ];

    /// Stable id, used in cell keys and export filenames.
    pub fn id(self) -> &'static str {
        match self {
            Template::Grid2x2 => "grid-2x2",
            Template::Grid3x3 => "grid-3x3",
            Template::Strip4 => "strip-4",
            Template::Feature3x3 => "feature-3x3",
            Template::Triptych => "triptych",
            Template::Print4x6 => "print-4x6",
        }
    }

    /// Look a template up by its [`Template::id`].
    pub fn from_id(id: &str) -> Result<Template, CollageError> {
        Template::ALL
            .into_iter()
            .find(|t| t.id() == id)
            .ok_or_else(|| CollageError::UnknownTemplate(id.to_string()))
    }

    /// Suggested download filename, `template-<id>.png`.
    pub fn filename(self) -> String {
        crate::export::export_filename(self.id())
    }

    /// Cell key for a placement of this template.
    pub fn key(self, section: &str, row: u32, col: u32) -> String {
        cell_key(self.id(), section, row, col)
    }

    /// Grid geometry and placements of this template.
    pub fn layout(self) -> LayoutDescriptor {
        let id = self.id();
        let cell = |section: &str, row, col| CellPlacement::new(cell_key(id, section, row, col), row, col);
        let span = |section: &str, row, col, row_span, col_span| {
            CellPlacement::spanning(cell_key(id, section, row, col), row, col, row_span, col_span)
        };
        let grid = |cols: u32, rows: u32| -> Vec<CellPlacement> {
            (0..rows)
                .flat_map(|row| (0..cols).map(move |col| (row, col)))
                .map(|(row, col)| cell("grid", row, col))
                .collect()
        };

        match self {
            Template::Grid2x2 => LayoutDescriptor::from_parts(2, 2, Sizing::CellBase(300.0), 8.0, grid(2, 2)),
            Template::Grid3x3 => LayoutDescriptor::from_parts(3, 3, Sizing::CellBase(200.0), 6.0, grid(3, 3)),
            Template::Strip4 => LayoutDescriptor::from_parts(1, 4, Sizing::CellBase(240.0), 8.0, grid(1, 4)),
            Template::Feature3x3 => LayoutDescriptor::from_parts(
                3,
                3,
                Sizing::CellBase(200.0),
                6.0,
                vec![
                    span("hero", 0, 0, 2, 2),
                    cell("side", 0, 2),
                    cell("side", 1, 2),
                    cell("bottom", 2, 0),
                    cell("bottom", 2, 1),
                    cell("bottom", 2, 2),
                ],
            ),
            Template::Triptych => LayoutDescriptor::from_parts(
                2,
                2,
                Sizing::CellBase(300.0),
                8.0,
                vec![span("main", 0, 0, 2, 1), cell("side", 0, 1), cell("side", 1, 1)],
            ),
            Template::Print4x6 => LayoutDescriptor::from_parts(
                2,
                3,
                Sizing::Physical(PhysicalSize {
                    width_in: 4.0,
                    height_in: 6.0,
                    dpi: 300.0,
                }),
                12.0,
                grid(2, 3),
            ),
        }
    }
}
