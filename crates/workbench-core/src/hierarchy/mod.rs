//! The hierarchy diagram: element arena, builder, layout and the canvas
//! session that ties them together.

pub mod builder;
pub mod layout;
pub mod session;
pub mod tree;

pub use builder::{BuildContext, ViewMapIndex, build_hierarchy, matching_children};
pub use layout::{LayoutConfig, LayoutPass};
pub use session::{HierarchyCanvas, RenderOptions, RootFilter};
pub use tree::{
    ChildCreationParameters, Connectors, ElementId, ElementKind, HierarchyElement, HierarchyTree,
    RenderState, ViewNode,
};
