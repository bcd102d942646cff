//! DCT perceptual hash.
//!
//! The image is reduced to 32x32 grayscale (ITU-R 601 luma, the weighting PIL's `L` mode uses),
//! transformed with a separable 2-D DCT-II, and the
//! top-left 8x8 low-frequency block is thresholded against its own median. Bits are packed in
//! row-major order, first coefficient in the most significant bit, matching the bit layout of the
//! common `phash` string encoding. Hashes of the same file by other tools can still differ in a
//! few bits because resampling filters differ.

use std::{f64::consts::PI, sync::OnceLock};

use image::{
	DynamicImage, GrayImage, Luma,
	imageops::{self, FilterType},
};

use nv_domain::feature::HashCode;

use crate::{Error, Result};

const IMG_SIZE: usize = 32;
const HASH_SIZE: usize = 8;

pub fn phash(bytes: &[u8]) -> Result<HashCode> {
	let img = image::load_from_memory(bytes)
		.map_err(|err| Error::Decode { message: err.to_string() })?;
	let gray = luma_601(&img);

	if gray.width() == 0 || gray.height() == 0 {
		return Err(Error::Decode { message: "image has no pixels".to_string() });
	}

	let small = imageops::resize(&gray, IMG_SIZE as u32, IMG_SIZE as u32, FilterType::Lanczos3);
	let mut pixels = [[0.0_f64; IMG_SIZE]; IMG_SIZE];

	for (x, y, pixel) in small.enumerate_pixels() {
		pixels[y as usize][x as usize] = f64::from(pixel.0[0]);
	}

	Ok(hash_pixels(&pixels))
}

/// Grayscale with 299/587/114 weights in 16-bit fixed point, rounded to nearest.
fn luma_601(img: &DynamicImage) -> GrayImage {
	let rgb = img.to_rgb8();

	GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
		let [r, g, b] = rgb.get_pixel(x, y).0;
		let weighted = u32::from(r) * 19_595 + u32::from(g) * 38_470 + u32::from(b) * 7_471;

		Luma([((weighted + 0x8000) >> 16) as u8])
	})
}

fn hash_pixels(pixels: &[[f64; IMG_SIZE]; IMG_SIZE]) -> HashCode {
	let coefficients = dct_2d(pixels);
	let mut low = Vec::with_capacity(HASH_SIZE * HASH_SIZE);

	for row in coefficients.iter().take(HASH_SIZE) {
		low.extend_from_slice(&row[..HASH_SIZE]);
	}

	let median = median(&low);
	let bits = low.iter().map(|value| *value > median).collect::<Vec<_>>();

	HashCode::from_bits(&bits)
}

fn dct_2d(pixels: &[[f64; IMG_SIZE]; IMG_SIZE]) -> [[f64; IMG_SIZE]; IMG_SIZE] {
	let table = cos_table();
	let mut columns = [[0.0_f64; IMG_SIZE]; IMG_SIZE];

	// Along each column first, then along each row of the result.
	for x in 0..IMG_SIZE {
		for k in 0..IMG_SIZE {
			let mut sum = 0.0;

			for (n, row) in pixels.iter().enumerate() {
				sum += row[x] * table[k][n];
			}

			columns[k][x] = 2.0 * sum;
		}
	}

	let mut out = [[0.0_f64; IMG_SIZE]; IMG_SIZE];

	for (y, row) in columns.iter().enumerate() {
		for k in 0..IMG_SIZE {
			let mut sum = 0.0;

			for (n, value) in row.iter().enumerate() {
				sum += value * table[k][n];
			}

			out[y][k] = 2.0 * sum;
		}
	}

	out
}

fn cos_table() -> &'static [[f64; IMG_SIZE]; IMG_SIZE] {
	static TABLE: OnceLock<[[f64; IMG_SIZE]; IMG_SIZE]> = OnceLock::new();

	TABLE.get_or_init(|| {
		let mut table = [[0.0_f64; IMG_SIZE]; IMG_SIZE];
		let size = IMG_SIZE as f64;

		for (k, row) in table.iter_mut().enumerate() {
			for (n, value) in row.iter_mut().enumerate() {
				*value = (PI * k as f64 * (2.0 * n as f64 + 1.0) / (2.0 * size)).cos();
			}
		}

		table
	})
}

fn median(values: &[f64]) -> f64 {
	let mut sorted = values.to_vec();

	sorted.sort_by(f64::total_cmp);

	let mid = sorted.len() / 2;

	if sorted.len() % 2 == 0 { (sorted[mid - 1] + sorted[mid]) / 2.0 } else { sorted[mid] }
}
