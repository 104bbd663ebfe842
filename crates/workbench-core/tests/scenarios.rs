//! End-to-end scenarios for the hierarchy display: building, filtering,
//! targeted removal, cycles and re-anchoring.

use std::collections::BTreeSet;

use workbench_core::controller::{DisplaySettings, HierarchyDisplay};
use workbench_core::geometry::{Orientation, Point, Vector};
use workbench_core::hierarchy::{
    BuildContext, ElementId, ElementKind, HierarchyCanvas, HierarchyTree, LayoutConfig,
    RenderOptions, ViewMapIndex, build_hierarchy,
};
use workbench_core::model::{ItemId, Link, SortField, SortOrder, ViewMap, WorkItem};
use workbench_core::project::ProjectData;

/// P (Story) contains C1 and C2 (Task, Active).
fn story_project() -> ProjectData {
    let mut p = ProjectData::new();
    p.add_item(WorkItem::new(1, "Story", "Active", "P"));
    p.add_item(WorkItem::new(2, "Task", "Active", "C1"));
    p.add_item(WorkItem::new(3, "Task", "Active", "C2"));
    p.add_link(Link::new("Contains", ItemId(1), ItemId(2)));
    p.add_link(Link::new("Contains", ItemId(1), ItemId(3)));
    p.add_view_map(ViewMap::new("Tasks", &["Story"], "Task", "Contains"));
    p
}

fn item_of(tree: &HierarchyTree, id: ElementId) -> Option<ItemId> {
    tree.get(id).and_then(|e| e.kind.item())
}

fn child_items(tree: &HierarchyTree, view: ElementId) -> Vec<ItemId> {
    tree.children(view)
        .iter()
        .filter_map(|c| item_of(tree, *c))
        .collect()
}

#[test]
fn story_with_two_tasks_renders_item_view_items() {
    let p = story_project();
    let mut canvas = HierarchyCanvas::default();
    let roots = canvas
        .render_view(Some(&p), &RenderOptions::default())
        .expect("render");

    let tree = canvas.tree();
    assert_eq!(roots.len(), 1);
    assert_eq!(item_of(tree, roots[0]), Some(ItemId(1)));
    let views = tree.children(roots[0]);
    assert_eq!(views.len(), 1);
    assert!(tree.get(views[0]).is_some_and(|e| e.kind.is_view()));
    assert_eq!(child_items(tree, views[0]), vec![ItemId(2), ItemId(3)]);
}

#[test]
fn declared_child_sort_orders_the_view() {
    let mut p = story_project();
    let map = p.view_maps()[0].id;
    p.remove_view_map(map).expect("map exists");
    p.add_view_map(
        ViewMap::new("Tasks", &["Story"], "Task", "Contains")
            .with_child_sort(SortOrder::descending(SortField::Id)),
    );
    let mut canvas = HierarchyCanvas::default();
    let roots = canvas
        .render_view(Some(&p), &RenderOptions::default())
        .expect("render");
    let view = canvas.tree().children(roots[0])[0];
    assert_eq!(child_items(canvas.tree(), view), vec![ItemId(3), ItemId(2)]);
}

#[test]
fn excluded_state_drops_the_child() {
    let mut p = story_project();
    p.set_item_state(ItemId(3), "Closed").expect("item exists");
    let excluded = BTreeSet::from(["Closed".to_string()]);

    let mut canvas = HierarchyCanvas::default();
    let roots = canvas
        .render_view(
            Some(&p),
            &RenderOptions {
                excluded_states: Some(&excluded),
                ..RenderOptions::default()
            },
        )
        .expect("render");
    let view = canvas.tree().children(roots[0])[0];
    assert_eq!(child_items(canvas.tree(), view), vec![ItemId(2)]);
    assert!(canvas.try_get_associated_visuals(ItemId(3)).is_none());
}

#[test]
fn removing_a_child_detaches_only_that_node() {
    let mut p = story_project();
    let mut display = HierarchyDisplay::new(LayoutConfig::default(), DisplaySettings::default());
    display.attach(&mut p);
    display.run_pending(Some(&p));

    let tree = display.canvas().tree();
    let parent = tree.items_for(ItemId(1))[0];
    let c2 = tree.items_for(ItemId(3))[0];
    let parent_visual = tree.get(parent).and_then(|e| e.visual).expect("visual");
    let c2_visual = tree.get(c2).and_then(|e| e.visual).expect("visual");
    let c2_position = display.canvas().canvas().position(c2_visual);
    let visuals_before = display.canvas().canvas().len();

    p.remove_item(ItemId(2));
    display.pump_events(Some(&p));

    // No rebuild was queued; only C1's card, two markers and line went away.
    assert!(!display.is_update_queued());
    assert_eq!(display.pending_jobs(), 0);
    let canvas = display.canvas();
    assert!(canvas.try_get_associated_visuals(ItemId(2)).is_none());
    assert_eq!(canvas.canvas().len(), visuals_before - 4);
    assert!(canvas.canvas().contains(parent_visual));
    assert!(canvas.tree().contains(c2));
    assert_eq!(canvas.canvas().position(c2_visual), c2_position);
}

#[test]
fn removing_an_unrendered_item_is_a_no_op() {
    let mut p = story_project();
    p.add_item(WorkItem::new(9, "Bug", "Active", "stray"));
    let mut display = HierarchyDisplay::new(LayoutConfig::default(), DisplaySettings::default());
    display.attach(&mut p);
    display.run_pending(Some(&p));
    let before = display.canvas().canvas().len();

    p.remove_item(ItemId(9));
    display.pump_events(Some(&p));
    assert_eq!(display.canvas().canvas().len(), before);
    assert!(!display.is_update_queued());
}

#[test]
fn cycle_terminates_and_cuts_the_repeat() {
    let mut p = ProjectData::new();
    p.add_item(WorkItem::new(1, "Node", "Active", "A"));
    p.add_item(WorkItem::new(2, "Node", "Active", "B"));
    p.add_link(Link::new("Next", ItemId(1), ItemId(2)));
    p.add_link(Link::new("Next", ItemId(2), ItemId(1)));
    p.add_view_map(ViewMap::new("Next", &["Node"], "Node", "Next"));

    let index = ViewMapIndex::new(&p, &BTreeSet::new());
    let excluded = BTreeSet::new();
    let ctx = BuildContext {
        project: &p,
        index: &index,
        hide_empty: false,
        excluded_states: &excluded,
    };
    let a = p.item(ItemId(1)).expect("A");
    let mut tree = HierarchyTree::new();
    build_hierarchy(&mut tree, &ctx, &[a], None);

    // A -> view -> B -> view -> A (leaf)
    let occurrences = tree.items_for(ItemId(1));
    assert_eq!(occurrences.len(), 2);
    assert_eq!(tree.depth(occurrences[1]), 4);
    assert!(tree.children(occurrences[1]).is_empty());

    // No expanded A sits below another A.
    for id in occurrences {
        let expanded = !tree.children(id).is_empty();
        let parent_view = tree.parent(id);
        assert!(!(expanded && tree.is_parent_in_tree(parent_view, ItemId(1))));
    }
}

#[test]
fn unentered_cycle_renders_from_its_first_member() {
    let mut p = ProjectData::new();
    p.add_item(WorkItem::new(1, "Node", "Active", "A"));
    p.add_item(WorkItem::new(2, "Node", "Active", "B"));
    p.add_link(Link::new("Next", ItemId(1), ItemId(2)));
    p.add_link(Link::new("Next", ItemId(2), ItemId(1)));
    p.add_view_map(ViewMap::new("Next", &["Node"], "Node", "Next"));

    let mut canvas = HierarchyCanvas::default();
    let roots = canvas
        .render_view(Some(&p), &RenderOptions::default())
        .expect("render");

    let tree = canvas.tree();
    assert_eq!(roots.len(), 1);
    assert_eq!(item_of(tree, roots[0]), Some(ItemId(1)));
    // A -> view -> B -> view -> A (leaf)
    assert_eq!(tree.items_for(ItemId(1)).len(), 2);
    assert_eq!(tree.items_for(ItemId(2)).len(), 1);
    assert!(!canvas.canvas().is_empty());
}

#[test]
fn filtered_root_without_a_view_map_renders_as_leaf() {
    let p = story_project();
    let only_c1 = |item: &WorkItem| item.id == ItemId(2);
    let options = RenderOptions {
        filter: Some(&only_c1),
        ..RenderOptions::default()
    };
    let mut canvas = HierarchyCanvas::default();
    let roots = canvas.render_view(Some(&p), &options).expect("render");

    let tree = canvas.tree();
    assert_eq!(roots.len(), 1);
    assert_eq!(item_of(tree, roots[0]), Some(ItemId(2)));
    assert!(tree.children(roots[0]).is_empty());
    assert!(canvas.element_position(roots[0]).is_some());
}

#[test]
fn shared_child_appears_under_each_parent() {
    let mut p = story_project();
    p.add_item(WorkItem::new(4, "Story", "Active", "Q"));
    p.add_link(Link::new("Contains", ItemId(4), ItemId(2)));
    let mut canvas = HierarchyCanvas::default();
    canvas
        .render_view(Some(&p), &RenderOptions::default())
        .expect("render");
    assert_eq!(canvas.try_get_associated_visuals(ItemId(2)).map(|v| v.len()), Some(2));
}

#[test]
fn hide_empty_views_toggles_childless_views() {
    let mut p = story_project();
    p.add_view_map(ViewMap::new("Bugs", &["Story"], "Bug", "Fixes"));

    for (hide, views) in [(true, 1), (false, 2)] {
        let mut canvas = HierarchyCanvas::default();
        let roots = canvas
            .render_view(
                Some(&p),
                &RenderOptions {
                    hide_empty_views: hide,
                    ..RenderOptions::default()
                },
            )
            .expect("render");
        let tree = canvas.tree();
        assert_eq!(tree.children(roots[0]).len(), views);
        let empty_views = tree
            .preorder()
            .into_iter()
            .filter(|id| tree.get(*id).is_some_and(|e| e.kind.is_view()))
            .filter(|id| tree.children(*id).is_empty())
            .count();
        assert_eq!(empty_views, views - 1);
    }
}

#[test]
fn rendering_twice_is_idempotent() {
    let p = story_project();
    let mut canvas = HierarchyCanvas::default();
    canvas
        .render_view(Some(&p), &RenderOptions::default())
        .expect("render");
    let points: Vec<(Point, Point)> = canvas
        .tree()
        .preorder()
        .iter()
        .filter_map(|id| canvas.tree().get(*id))
        .map(|e| (e.entry_point, e.exit_point))
        .collect();
    let visuals = canvas.canvas().len();

    canvas.relayout(Orientation::Horizontal);
    let again: Vec<(Point, Point)> = canvas
        .tree()
        .preorder()
        .iter()
        .filter_map(|id| canvas.tree().get(*id))
        .map(|e| (e.entry_point, e.exit_point))
        .collect();
    assert_eq!(points, again);
    assert_eq!(canvas.canvas().len(), visuals);
}

#[test]
fn top_left_round_trip() {
    let p = story_project();
    let mut canvas = HierarchyCanvas::default();
    let roots = canvas
        .render_view(Some(&p), &RenderOptions::default())
        .expect("render");
    canvas.translate(roots[0], Vector::new(75.0, 40.0), true);

    canvas.move_elements_to_top_left();
    let size = canvas.resize_to_content();

    let cards: Vec<_> = canvas
        .tree()
        .preorder()
        .iter()
        .filter_map(|id| canvas.tree().get(*id)?.visual)
        .filter_map(|v| canvas.canvas().get(v))
        .map(|v| v.bounds)
        .collect();
    let min_x = cards.iter().map(|b| b.x).fold(f64::INFINITY, f64::min);
    let min_y = cards.iter().map(|b| b.y).fold(f64::INFINITY, f64::min);
    assert_eq!((min_x, min_y), (0.0, 0.0));

    let (max_x, max_y) = canvas
        .canvas()
        .iter()
        .fold((0.0_f64, 0.0_f64), |(w, h), (_, v)| {
            (w.max(v.bounds.right()), h.max(v.bounds.bottom()))
        });
    assert_eq!((size.width, size.height), (max_x, max_y));
}

#[test]
fn vertical_orientation_flows_rightward() {
    let p = story_project();
    let mut canvas = HierarchyCanvas::default();
    let roots = canvas
        .render_view(
            Some(&p),
            &RenderOptions {
                orientation: Orientation::Vertical,
                ..RenderOptions::default()
            },
        )
        .expect("render");
    let tree = canvas.tree();
    let story = tree.get(roots[0]).expect("story");
    let view = tree.get(tree.children(roots[0])[0]).expect("view");
    assert!(view.entry_point.x > story.exit_point.x);
    assert_eq!(view.entry_point.y, story.exit_point.y);
    assert!(matches!(story.kind, ElementKind::Item { .. }));
}
