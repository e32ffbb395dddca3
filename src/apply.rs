//! The traversal driver: runs one program over every selected channel of
//! every pixel, scanline by scanline.

use crate::{
    engine::ImageEngine,
    error::{ChanfxError, ChanfxResult},
    machine,
    pixel::{Channel, ChannelMask, Pixel, Quantum},
    program::Program,
};

/// Apply `program` to `source`, recomputing the channels in `mask` and
/// passing every other color channel through unchanged.
///
/// A fresh destination of identical dimensions is allocated up front and each
/// scanline is committed atomically; on any window acquisition, commit, or
/// evaluation failure, the destination is released before the error is
/// returned, so the caller never observes a partially built image. The source
/// is never written.
///
/// The opacity channel does not run through the program: the destination
/// opacity is always 0.9x the source opacity, whatever `mask` says.
#[tracing::instrument(skip_all, fields(mask = ?mask))]
pub fn apply<E: ImageEngine>(
    engine: &mut E,
    source: &E::Handle,
    program: &Program,
    mask: ChannelMask,
) -> ChanfxResult<E::Handle> {
    let q = engine.quantum_max();
    let (width, height) = engine
        .dimensions(source)
        .map_err(|f| ChanfxError::acquisition(format!("source dimensions: {f}")))?;
    let mut dest = engine
        .allocate_like(source)
        .map_err(|f| ChanfxError::acquisition(format!("destination allocation: {f}")))?;

    match traverse(engine, source, &mut dest, program, mask, q, width, height) {
        Ok(()) => Ok(dest),
        Err(err) => {
            tracing::debug!(%err, "traversal aborted, releasing destination");
            engine.release(dest);
            Err(err)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn traverse<E: ImageEngine>(
    engine: &mut E,
    source: &E::Handle,
    dest: &mut E::Handle,
    program: &Program,
    mask: ChannelMask,
    q: Quantum,
    width: u32,
    height: u32,
) -> ChanfxResult<()> {
    // Both row buffers are reused for every scanline; the per-pixel loop
    // itself does not allocate.
    let mut src_row = vec![Pixel::default(); width as usize];
    let mut dst_row = vec![Pixel::default(); width as usize];

    for y in 0..height {
        engine
            .read_window(source, y, &mut src_row)
            .map_err(|f| ChanfxError::acquisition(format!("source row {y}: {f}")))?;

        for (sp, dp) in src_row.iter().zip(dst_row.iter_mut()) {
            *dp = shade_pixel(*sp, program, mask, q)?;
        }

        engine
            .commit_window(dest, y, &dst_row)
            .map_err(|f| ChanfxError::commit(format!("destination row {y}: {f}")))?;
    }
    Ok(())
}

fn shade_pixel(
    source: Pixel,
    program: &Program,
    mask: ChannelMask,
    q: Quantum,
) -> ChanfxResult<Pixel> {
    // The destination starts as a copy, so unselected channels pass through
    // byte-for-byte.
    let mut dest = source;
    let normalized = source.to_normalized(q);
    let mut out = normalized;
    let mut written = ChannelMask::EMPTY;

    for (i, ch) in Channel::RGB.into_iter().enumerate() {
        if mask.contains(ch) {
            out[i] = machine::evaluate(program, normalized[i], ch)?;
            written = written.with(ch);
        }
    }
    dest.apply_normalized_masked(out, written, q);

    // Fixed opacity policy: opacity is rescaled to 90%, never evaluated.
    // Widened intermediate: opacity can be as large as Q itself, and Q is an
    // arbitrary runtime value up to u32::MAX.
    let rescaled = u64::from(source.opacity(q)) * 90 / 100;
    dest.set_opacity(q, rescaled as u32);
    Ok(dest)
}
