mod test_intersect_basic;
mod test_view_roundtrip;
