//! Target dimension calculation.

/// Fits `orig_w x orig_h` into a `max_w x max_h` box.
///
/// Sources that already fit are left alone. With `preserve_aspect` the axis
/// with the tighter ratio lands exactly on its bound and the other follows
/// proportionally; otherwise scaling is driven by width alone and never
/// enlarges. The derived side is floored, minimum 1px.
pub fn calculate_dimensions(
    orig_w: u32,
    orig_h: u32,
    max_w: u32,
    max_h: u32,
    preserve_aspect: bool,
) -> (u32, u32) {
    if orig_w == 0 || orig_h == 0 || (orig_w <= max_w && orig_h <= max_h) {
        return (orig_w, orig_h);
    }

    if !preserve_aspect {
        if orig_w <= max_w {
            return (orig_w, orig_h);
        }
        return (max_w.max(1), proportional(orig_h, max_w, orig_w));
    }

    // max_w / orig_w <= max_h / orig_h, cross-multiplied to stay exact.
    let width_bound = u64::from(max_w) * u64::from(orig_h) <= u64::from(max_h) * u64::from(orig_w);
    if width_bound {
        (max_w.max(1), proportional(orig_h, max_w, orig_w))
    } else {
        (proportional(orig_w, max_h, orig_h), max_h.max(1))
    }
}

/// `floor(value * num / den)`, at least 1.
fn proportional(value: u32, num: u32, den: u32) -> u32 {
    let scaled = u64::from(value) * u64::from(num) / u64::from(den);
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}
