use std::f32::consts::PI;

use eframe::egui::{Vec2, vec2};

use crate::model::Hierarchy;

use super::BundleOptions;

const MIN_TEXT_RADIUS: f32 = 24.0;
const CHAR_WIDTH_RATIO: f32 = 0.6;

/// Radii of the concentric rings of the flare, all relative to the centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadialLayout {
    pub width: f32,
    pub text_height: f32,
    pub text_width: f32,
    pub text_radius: f32,
    pub track_radius: f32,
    pub track_width: f32,
    pub hierarchy_radius: f32,
    /// Half of the angular span of one track arc, in radians.
    pub arc_half_angle: f32,
}

impl RadialLayout {
    pub fn compute(width: f32, leaf_count: usize, longest_label: usize, options: &BundleOptions) -> Self {
        let leaves = leaf_count.max(1) as f32;
        let text_height = (0.8 * PI * width / leaves).min(options.max_text_height);
        let text_width = longest_label as f32 * text_height * CHAR_WIDTH_RATIO;

        let text_radius = (width / 2.0 - text_width - options.label_padding)
            .max(MIN_TEXT_RADIUS + options.track_width + options.track_gap);
        let track_radius = (text_radius - options.track_gap - options.track_width).max(MIN_TEXT_RADIUS);
        let hierarchy_radius = (track_radius - options.track_gap).max(1.0);
        let arc_half_angle = (text_height / (2.0 * text_radius)).clamp(0.0, 1.0).asin();

        Self {
            width,
            text_height,
            text_width,
            text_radius,
            track_radius,
            track_width: options.track_width,
            hierarchy_radius,
            arc_half_angle,
        }
    }

    /// Inner and outer arc radius for a track entry of `size`.
    pub fn track_radii(&self, size: f32) -> (f32, f32) {
        (
            self.track_radius + self.track_width * (1.0 - size) / 2.0,
            self.track_radius + self.track_width * (1.0 + size) / 2.0,
        )
    }
}

/// Position of a hierarchy node in the cluster layout: angle in degrees
/// clockwise from twelve o'clock and distance from the centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterPoint {
    pub angle: f32,
    pub radius: f32,
}

/// Leaves are equi-spaced on the outer ring; internal nodes sit at the mean
/// angle of their children, pulled inwards by their height.
pub fn cluster_layout(hierarchy: &Hierarchy, radius: f32) -> Vec<ClusterPoint> {
    let nodes = hierarchy.nodes();
    let mut points = vec![ClusterPoint { angle: 0.0, radius: 0.0 }; nodes.len()];
    let leaves = hierarchy.leaves();
    let step = 360.0 / leaves.len().max(1) as f32;

    for (order, &leaf) in leaves.iter().enumerate() {
        points[leaf].angle = (order as f32 + 0.5) * step;
    }

    let root_height = hierarchy.height().max(1) as f32;
    for index in (0..nodes.len()).rev() {
        let node = &nodes[index];
        if !node.children.is_empty() {
            let sum = node
                .children
                .iter()
                .map(|&child| points[child].angle)
                .sum::<f32>();
            points[index].angle = sum / node.children.len() as f32;
        }
        points[index].radius = radius * (1.0 - node.height as f32 / root_height);
    }

    points
}

pub fn polar(angle_degrees: f32, radius: f32) -> Vec2 {
    let theta = (angle_degrees - 90.0).to_radians();
    vec2(theta.cos(), theta.sin()) * radius
}

/// Inverse of [`polar`]; the angle is normalized to `[0, 360)`.
pub fn to_polar(offset: Vec2) -> (f32, f32) {
    let angle = (offset.y.atan2(offset.x).to_degrees() + 90.0).rem_euclid(360.0);
    (angle, offset.length())
}

/// Leaf slot under `angle_degrees` for `leaf_count` equi-spaced leaves.
pub fn leaf_slot(angle_degrees: f32, leaf_count: usize) -> Option<usize> {
    if leaf_count == 0 {
        return None;
    }
    let step = 360.0 / leaf_count as f32;
    Some(((angle_degrees / step).floor() as usize).min(leaf_count - 1))
}

/// Straightens the control polygon towards the chord between its end points.
/// `beta == 1` keeps the hierarchy path, `beta == 0` yields the chord.
pub fn bundle_points(points: &[Vec2], beta: f32) -> Vec<Vec2> {
    let count = points.len();
    if count < 3 {
        return points.to_vec();
    }

    let (first, last) = (points[0], points[count - 1]);
    let span = (count - 1) as f32;
    points
        .iter()
        .enumerate()
        .map(|(index, &point)| {
            let chord = first + (last - first) * (index as f32 / span);
            point * beta + chord * (1.0 - beta)
        })
        .collect()
}

/// Samples a clamped uniform cubic B-spline over `control`; the curve starts
/// and ends on the first and last control point.
pub fn basis_spline(control: &[Vec2], samples_per_segment: usize) -> Vec<Vec2> {
    if control.len() < 3 {
        return control.to_vec();
    }

    let mut padded = Vec::with_capacity(control.len() + 4);
    padded.extend([control[0], control[0]]);
    padded.extend_from_slice(control);
    let last = control[control.len() - 1];
    padded.extend([last, last]);

    let samples = samples_per_segment.max(1);
    let mut curve = Vec::with_capacity((padded.len() - 3) * samples + 1);
    for window in padded.windows(4) {
        let [p0, p1, p2, p3] = [window[0], window[1], window[2], window[3]];
        for step in 0..samples {
            let t = step as f32 / samples as f32;
            curve.push(basis_point(p0, p1, p2, p3, t));
        }
    }
    curve.push(last);
    curve
}

fn basis_point(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let t2 = t * t;
    let t3 = t2 * t;
    let w0 = (1.0 - t).powi(3);
    let w1 = 3.0 * t3 - 6.0 * t2 + 4.0;
    let w2 = -3.0 * t3 + 3.0 * t2 + 3.0 * t + 1.0;
    let w3 = t3;
    (p0 * w0 + p1 * w1 + p2 * w2 + p3 * w3) / 6.0
}
