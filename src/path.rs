//! Path / shape decoder (component H): normalizes the union-of-variants
//! shape-path archive (spec §4.H) into a single [`PathSource`] value a
//! renderer can consume without knowing which archive variant produced it.

use crate::protos::tsd;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl From<&crate::protos::tsp::Point> for Point {
    fn from(p: &crate::protos::tsp::Point) -> Self {
        Point { x: p.x.unwrap_or(0.0), y: p.y.unwrap_or(0.0) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl From<&crate::protos::tsp::Size> for Size {
    fn from(s: &crate::protos::tsp::Size) -> Self {
        Size { width: s.width.unwrap_or(0.0), height: s.height.unwrap_or(0.0) }
    }
}

/// One element of a bézier path, spec §4.H: the point count per kind is
/// fixed (1/1/2/3/0) and enforced by this enum's shape rather than a
/// separate length field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BezierElement {
    MoveTo(Point),
    LineTo(Point),
    QuadCurveTo { control: Point, point: Point },
    CurveTo { control1: Point, control2: Point, point: Point },
    CloseSubpath,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BezierPath {
    pub elements: Vec<BezierElement>,
    pub closed: bool,
    pub natural_size: Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditableNodeKind {
    Sharp,
    Bezier,
    Smooth,
}

impl EditableNodeKind {
    fn from_u32(v: u32) -> Self {
        match v {
            1 => Self::Bezier,
            2 => Self::Smooth,
            _ => Self::Sharp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditableNode {
    pub in_control: Point,
    pub point: Point,
    pub out_control: Point,
    pub kind: EditableNodeKind,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditableSubpath {
    pub nodes: Vec<EditableNode>,
    pub closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    Quadratic,
    Orthogonal,
}

/// A normalized shape path, spec §4.H. Exactly one variant is constructed
/// from whichever field the archive's tagged union had set.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSource {
    Point { shape_type: u32, defining_point: Point, natural_size: Size },
    Scalar { shape_type: u32, scalar: f64, natural_size: Size, continuous_curve: bool },
    Bezier(BezierPath),
    Callout { natural_size: Size, tail_position: Point, tail_size: Size, corner_radius: f64, center_tail: bool },
    Connection { kind: ConnectionKind, path: BezierPath, start_outset: f64, end_outset: f64 },
    EditableBezier { subpaths: Vec<EditableSubpath>, natural_size: Size },
}

fn decode_bezier_element(e: &tsd::BezierElement) -> Option<BezierElement> {
    let point = || e.point.as_ref().map(Point::from).unwrap_or_default();
    let cp1 = || e.control_point1.as_ref().map(Point::from).unwrap_or_default();
    let cp2 = || e.control_point2.as_ref().map(Point::from).unwrap_or_default();

    Some(match e.element_type {
        0 => BezierElement::MoveTo(point()),
        1 => BezierElement::LineTo(point()),
        2 => BezierElement::QuadCurveTo { control: cp1(), point: point() },
        3 => BezierElement::CurveTo { control1: cp1(), control2: cp2(), point: point() },
        4 => BezierElement::CloseSubpath,
        _ => return None,
    })
}

fn decode_bezier_path(src: &tsd::BezierPathSource) -> BezierPath {
    BezierPath {
        elements: src.elements.iter().filter_map(decode_bezier_element).collect(),
        closed: src.closed.unwrap_or(false),
        natural_size: src.size.as_ref().map(Size::from).unwrap_or_default(),
    }
}

/// Decode a shape-path archive into its one populated variant. Returns
/// `None` if the archive is the zero-variant case (no union member set) —
/// tolerated by the traversal engine as "no path", not a corruption error.
pub fn decode(archive: &tsd::PathSourceArchive) -> Option<PathSource> {
    if let Some(p) = &archive.point_path {
        return Some(PathSource::Point {
            shape_type: p.shape_type.unwrap_or(0),
            defining_point: p.defining_point.as_ref().map(Point::from).unwrap_or_default(),
            natural_size: p.size.as_ref().map(Size::from).unwrap_or_default(),
        });
    }
    if let Some(s) = &archive.scalar_path {
        return Some(PathSource::Scalar {
            shape_type: s.shape_type.unwrap_or(0),
            scalar: s.scalar.unwrap_or(0.0),
            natural_size: s.size.as_ref().map(Size::from).unwrap_or_default(),
            continuous_curve: s.continuous_curve.unwrap_or(false),
        });
    }
    if let Some(b) = &archive.bezier_path {
        return Some(PathSource::Bezier(decode_bezier_path(b)));
    }
    if let Some(c) = &archive.callout_path {
        return Some(PathSource::Callout {
            natural_size: c.size.as_ref().map(Size::from).unwrap_or_default(),
            tail_position: c.tail_position.as_ref().map(Point::from).unwrap_or_default(),
            tail_size: c.tail_size.as_ref().map(Size::from).unwrap_or_default(),
            corner_radius: c.corner_radius.unwrap_or(0.0),
            center_tail: c.center_tail.unwrap_or(false),
        });
    }
    if let Some(conn) = &archive.connection_path {
        let kind = if conn.connection_kind == Some(1) { ConnectionKind::Orthogonal } else { ConnectionKind::Quadratic };
        let path = conn.bezier_path.as_ref().map(decode_bezier_path).unwrap_or_default();
        return Some(PathSource::Connection {
            kind,
            path,
            start_outset: conn.start_outset.unwrap_or(0.0),
            end_outset: conn.end_outset.unwrap_or(0.0),
        });
    }
    if let Some(eb) = &archive.editable_bezier_path {
        let subpaths = eb
            .subpaths
            .iter()
            .map(|sp| EditableSubpath {
                nodes: sp
                    .nodes
                    .iter()
                    .map(|n| EditableNode {
                        in_control: n.control_point1.as_ref().map(Point::from).unwrap_or_default(),
                        point: n.point.as_ref().map(Point::from).unwrap_or_default(),
                        out_control: n.control_point2.as_ref().map(Point::from).unwrap_or_default(),
                        kind: EditableNodeKind::from_u32(n.node_kind.unwrap_or(0)),
                    })
                    .collect(),
                closed: sp.closed.unwrap_or(false),
            })
            .collect();
        return Some(PathSource::EditableBezier {
            subpaths,
            natural_size: eb.size.as_ref().map(Size::from).unwrap_or_default(),
        });
    }
    None
}
