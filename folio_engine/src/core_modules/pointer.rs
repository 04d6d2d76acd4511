// THEORY:
// The `pointer` module is the entry point of the drawing pipeline. Browsers report
// pointer and touch positions in CSS pixels relative to the viewport, while the
// paint buffer has its own backing resolution. The two only agree when the canvas
// is displayed at exactly its native size, which is not something the pipeline can
// rely on (zoom, responsive layouts, high-DPI screens).
//
// Key architectural principles:
// 1.  **Single Conversion Point**: Every raw position passes through
//     `DisplayRect::to_surface` exactly once. Nothing downstream ever sees client
//     coordinates, so the rasterizer can treat its input as surface units.
// 2.  **No Clamping Here**: A pointer that drifts past the edge while a button is
//     held still produces a (possibly negative) surface point. Clipping is the
//     surface's job, because a stamp centred just outside the canvas still paints
//     its inner neighbours.

pub mod pointer {
    pub type Coordinate = f32;

    /// A raw position in surface units, before grid snapping.
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct SurfacePoint {
        pub x: Coordinate,
        pub y: Coordinate,
    }

    impl SurfacePoint {
        pub fn new(x: Coordinate, y: Coordinate) -> Self {
            Self { x, y }
        }
    }

    /// The on-screen rectangle the canvas occupies, in client pixels.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct DisplayRect {
        pub left: Coordinate,
        pub top: Coordinate,
        pub width: Coordinate,
        pub height: Coordinate,
    }

    impl DisplayRect {
        /// Maps a client-space position onto a surface of the given backing size,
        /// compensating for any CSS scaling between the two.
        pub fn to_surface(
            &self,
            client_x: Coordinate,
            client_y: Coordinate,
            surface_width: u32,
            surface_height: u32,
        ) -> SurfacePoint {
            let scale_x = Self::scale(surface_width, self.width);
            let scale_y = Self::scale(surface_height, self.height);
            SurfacePoint {
                x: (client_x - self.left) * scale_x,
                y: (client_y - self.top) * scale_y,
            }
        }

        // A collapsed element (width 0 during layout) maps 1:1 rather than to infinity.
        fn scale(backing: u32, displayed: Coordinate) -> Coordinate {
            if displayed <= 0.0 {
                1.0
            } else {
                backing as Coordinate / displayed
            }
        }
    }
}
