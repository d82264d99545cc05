//! Embedded ground-truth reference tables for supported 24-patch cards.
//!
//! Values are linear 8-bit RGB as published by the card vendors. Patches are
//! stored row-major in the canonical card order (top-left first), one
//! `[r, g, b]` triple per patch.

/// Number of patches on the supported 6x4 card designs.
pub const REFERENCE_PATCHES: usize = 24;

/// CameraTrax 24-patch card ground-truth colors.
pub const CAMERA_TRAX_RGB: [[f64; 3]; REFERENCE_PATCHES] = [
    [115.0, 83.0, 68.0],
    [196.0, 147.0, 127.0],
    [91.0, 122.0, 155.0],
    [94.0, 108.0, 66.0],
    [129.0, 128.0, 176.0],
    [98.0, 190.0, 168.0],
    [223.0, 124.0, 47.0],
    [58.0, 92.0, 174.0],
    [194.0, 82.0, 96.0],
    [93.0, 60.0, 103.0],
    [162.0, 190.0, 62.0],
    [229.0, 158.0, 41.0],
    [49.0, 66.0, 147.0],
    [77.0, 153.0, 71.0],
    [173.0, 57.0, 60.0],
    [241.0, 201.0, 25.0],
    [190.0, 85.0, 150.0],
    [0.0, 135.0, 166.0],
    [242.0, 243.0, 245.0],
    [203.0, 203.0, 204.0],
    [162.0, 163.0, 162.0],
    [120.0, 120.0, 120.0],
    [84.0, 84.0, 84.0],
    [50.0, 50.0, 52.0],
];

/// X-Rite ColorChecker 24-patch card ground-truth colors.
pub const X_RITE_RGB: [[f64; 3]; REFERENCE_PATCHES] = [
    [115.0, 82.0, 68.0],
    [194.0, 150.0, 130.0],
    [98.0, 122.0, 157.0],
    [87.0, 108.0, 67.0],
    [133.0, 128.0, 177.0],
    [103.0, 189.0, 170.0],
    [214.0, 126.0, 44.0],
    [80.0, 91.0, 166.0],
    [193.0, 90.0, 99.0],
    [94.0, 60.0, 108.0],
    [157.0, 188.0, 64.0],
    [224.0, 163.0, 46.0],
    [56.0, 61.0, 150.0],
    [70.0, 148.0, 73.0],
    [175.0, 54.0, 60.0],
    [231.0, 199.0, 31.0],
    [187.0, 86.0, 149.0],
    [8.0, 133.0, 161.0],
    [243.0, 243.0, 242.0],
    [200.0, 200.0, 200.0],
    [160.0, 160.0, 160.0],
    [122.0, 122.0, 121.0],
    [85.0, 85.0, 85.0],
    [52.0, 52.0, 52.0],
];
