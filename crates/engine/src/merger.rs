use crate::timeline::Window;

/// Drops windows without a usable keyword, keeping the survivors in their
/// original order and with their original time ranges. Neighbours are not
/// stretched over the removed span, so the result may contain gaps.
///
/// An empty return value means nothing can be resolved and the render must
/// stop.
pub fn merge_empty_intervals(windows: Vec<Window>) -> Vec<Window> {
    windows.into_iter().filter(Window::is_resolvable).collect()
}
