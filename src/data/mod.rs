// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from a folder of image files to a tensor batch:
//
//   image folder
//       │
//       ▼
//   FlatFolderDataset  → fixed, sorted list of file paths
//       │
//       ▼
//   InfiniteSampler    → endless reshuffled index stream
//       │               (FolderStream binds dataset + sampler + loader)
//       │
//       ▼
//   BatchLoader        → decodes B images in parallel (rayon)
//       │
//       ▼
//   ImageTransform     → resize / random crop / scale to [0,1]
//       │
//       ▼
//   ImageBatcher       → stacks samples into a [B, 3, H, W] tensor
//
// Content and style each get their own dataset and sampler.

/// Flat folder of image files
pub mod dataset;

/// Infinite reshuffling index sampler
pub mod sampler;

/// Decode + resize + crop
pub mod transform;

/// Parallel batch decoding on a dedicated worker pool
pub mod loader;

/// Stacks ImageSamples into Burn tensors and back
pub mod batcher;

/// Dataset + sampler + loader as one endless ImageStream
pub mod stream;
