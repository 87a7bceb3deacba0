//! Barnes-Hut quadtree for approximate pairwise repulsion.

/// Leaves below this depth hold at most one point; at the limit coincident
/// points share a leaf.
const MAX_DEPTH: usize = 32;

/// Squared distances are clamped to this so near-coincident bodies stay finite.
const MIN_DISTANCE_SQ: f64 = 1.0;

/// Offset used to separate exactly coincident bodies.
const JITTER: f64 = 1e-3;

#[derive(Clone, Debug)]
struct Cell {
	x0: f64,
	y0: f64,
	size: f64,
	charge: f64,
	cx: f64,
	cy: f64,
	children: Option<[usize; 4]>,
	points: Vec<usize>,
}

impl Cell {
	fn new(x0: f64, y0: f64, size: f64) -> Self {
		Self {
			x0,
			y0,
			size,
			charge: 0.0,
			cx: 0.0,
			cy: 0.0,
			children: None,
			points: Vec::new(),
		}
	}

	fn quadrant(&self, x: f64, y: f64) -> usize {
		let half = self.size / 2.0;
		usize::from(x >= self.x0 + half) + 2 * usize::from(y >= self.y0 + half)
	}
}

/// Arena-backed quadtree over a fixed set of points.
#[derive(Clone, Debug)]
pub struct QuadTree {
	cells: Vec<Cell>,
}

impl QuadTree {
	/// Builds the tree and accumulates `point_charge` per point into every
	/// cell's total charge and centre of charge.
	pub fn new(points: &[(f64, f64)], point_charge: f64) -> Self {
		let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
		let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
		for &(x, y) in points {
			x0 = x0.min(x);
			y0 = y0.min(y);
			x1 = x1.max(x);
			y1 = y1.max(y);
		}
		if points.is_empty() {
			(x0, y0, x1, y1) = (0.0, 0.0, 0.0, 0.0);
		}
		// Pad so points on the max edge still fall inside.
		let size = (x1 - x0).max(y1 - y0).max(1.0) * (1.0 + 1e-9);

		let mut tree = Self {
			cells: vec![Cell::new(x0, y0, size)],
		};
		for index in 0..points.len() {
			tree.insert(index, points);
		}
		tree.accumulate(0, points, point_charge);
		tree
	}

	fn insert(&mut self, index: usize, points: &[(f64, f64)]) {
		let (px, py) = points[index];
		let mut cell = 0;
		let mut depth = 0;
		loop {
			if let Some(children) = self.cells[cell].children {
				cell = children[self.cells[cell].quadrant(px, py)];
				depth += 1;
				continue;
			}
			if self.cells[cell].points.is_empty() || depth >= MAX_DEPTH {
				self.cells[cell].points.push(index);
				return;
			}
			let children = self.split(cell);
			for other in std::mem::take(&mut self.cells[cell].points) {
				let (ox, oy) = points[other];
				let child = children[self.cells[cell].quadrant(ox, oy)];
				self.cells[child].points.push(other);
			}
		}
	}

	fn split(&mut self, cell: usize) -> [usize; 4] {
		let Cell { x0, y0, size, .. } = self.cells[cell];
		let half = size / 2.0;
		let first = self.cells.len();
		for q in 0..4 {
			let x = if q & 1 == 1 { x0 + half } else { x0 };
			let y = if q & 2 == 2 { y0 + half } else { y0 };
			self.cells.push(Cell::new(x, y, half));
		}
		let children = [first, first + 1, first + 2, first + 3];
		self.cells[cell].children = Some(children);
		children
	}

	fn accumulate(&mut self, cell: usize, points: &[(f64, f64)], point_charge: f64) {
		let (mut charge, mut cx, mut cy) = (0.0, 0.0, 0.0);
		if let Some(children) = self.cells[cell].children {
			for child in children {
				self.accumulate(child, points, point_charge);
				let c = &self.cells[child];
				charge += c.charge;
				cx += c.charge * c.cx;
				cy += c.charge * c.cy;
			}
		}
		for &p in &self.cells[cell].points {
			charge += point_charge;
			cx += point_charge * points[p].0;
			cy += point_charge * points[p].1;
		}

		let c = &mut self.cells[cell];
		c.charge = charge;
		if charge != 0.0 {
			c.cx = cx / charge;
			c.cy = cy / charge;
		}
	}

	/// Total charge of the tree.
	pub fn charge(&self) -> f64 {
		self.cells[0].charge
	}

	/// Velocity change on point `index` from every other point.
	///
	/// A cell of width `w` whose centre of charge lies at squared distance
	/// `d²` is treated as a single body when `w² < θ² d²`, so `theta = 0`
	/// visits every point.
	pub fn force_on(&self, index: usize, points: &[(f64, f64)], point_charge: f64, theta: f64) -> (f64, f64) {
		let (x, y) = points[index];
		let theta_sq = theta * theta;
		let (mut fx, mut fy) = (0.0, 0.0);
		let mut stack = vec![0];

		while let Some(cell) = stack.pop() {
			let c = &self.cells[cell];
			if c.charge == 0.0 {
				continue;
			}
			let (dx, dy) = (c.cx - x, c.cy - y);
			let dist_sq = dx * dx + dy * dy;

			if c.size * c.size < theta_sq * dist_sq {
				let k = c.charge / dist_sq.max(MIN_DISTANCE_SQ);
				fx += dx * k;
				fy += dy * k;
				continue;
			}
			if let Some(children) = c.children {
				stack.extend(children);
				continue;
			}
			for &p in &c.points {
				if p == index {
					continue;
				}
				let (mut dx, dy) = (points[p].0 - x, points[p].1 - y);
				if dx == 0.0 && dy == 0.0 {
					dx = if index < p { JITTER } else { -JITTER };
				}
				let k = point_charge / (dx * dx + dy * dy).max(MIN_DISTANCE_SQ);
				fx += dx * k;
				fy += dy * k;
			}
		}
		(fx, fy)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn brute_force(index: usize, points: &[(f64, f64)], charge: f64) -> (f64, f64) {
		let (x, y) = points[index];
		points
			.iter()
			.enumerate()
			.filter(|&(i, _)| i != index)
			.fold((0.0, 0.0), |(fx, fy), (_, &(px, py))| {
				let (dx, dy) = (px - x, py - y);
				let k = charge / (dx * dx + dy * dy).max(MIN_DISTANCE_SQ);
				(fx + dx * k, fy + dy * k)
			})
	}

	fn grid() -> Vec<(f64, f64)> {
		(0..36)
			.map(|i| ((i % 6) as f64 * 17.0 + (i as f64) * 0.3, (i / 6) as f64 * 13.0))
			.collect()
	}

	#[test]
	fn zero_theta_is_exact() {
		let points = grid();
		let tree = QuadTree::new(&points, -10.0);
		assert!((tree.charge() + 360.0).abs() < 1e-9);
		for i in [0, 7, 20, 35] {
			let (fx, fy) = tree.force_on(i, &points, -10.0, 0.0);
			let (ex, ey) = brute_force(i, &points, -10.0);
			assert!((fx - ex).abs() < 1e-9, "fx {fx} vs {ex}");
			assert!((fy - ey).abs() < 1e-9, "fy {fy} vs {ey}");
		}
	}

	#[test]
	fn approximation_stays_close() {
		let points = grid();
		let tree = QuadTree::new(&points, -10.0);
		let (fx, fy) = tree.force_on(0, &points, -10.0, 0.8);
		let (ex, ey) = brute_force(0, &points, -10.0);
		let error = ((fx - ex).powi(2) + (fy - ey).powi(2)).sqrt();
		let magnitude = (ex * ex + ey * ey).sqrt();
		assert!(error < 0.2 * magnitude, "error {error} vs {magnitude}");
	}

	#[test]
	fn negative_charge_repels() {
		let points = [(0.0, 0.0), (10.0, 0.0)];
		let tree = QuadTree::new(&points, -5.0);
		let (fx, _) = tree.force_on(0, &points, -5.0, 0.0);
		assert!(fx < 0.0);
	}

	#[test]
	fn coincident_points_are_pushed_apart() {
		let points = [(5.0, 5.0), (5.0, 5.0), (5.0, 5.0)];
		let tree = QuadTree::new(&points, -1.0);
		let (first, _) = tree.force_on(0, &points, -1.0, 0.5);
		let (last, _) = tree.force_on(2, &points, -1.0, 0.5);
		assert!(first.is_finite() && last.is_finite());
		assert!(first < 0.0);
		assert!(last > 0.0);
	}
}
