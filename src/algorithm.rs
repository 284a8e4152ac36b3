//! The JWZ threading algorithm.
//!
//! Turns a flat, ordered list of [`Message`] records into a forest of
//! containers in five steps: link containers along declared reference
//! chains, extract the root set, discard the working id table, prune
//! empty containers, and optionally group roots by normalized subject.
//!
//! Processing order is significant (first-assigned links win) but the
//! output structure is stable for a fixed input order. Timestamps are
//! deliberately ignored throughout; callers who want a particular
//! presentation order use [`sort_threads`] or sort children themselves.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::container::{ContainerId, Forest};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::utils::normalize_subject;

/// Thread a list of messages.
///
/// Consumes the messages and returns a [`Forest`] whose root set holds one
/// container per discovered thread, in working-table order. Containers for
/// ids that were referenced but never seen remain as dummies where the
/// structure requires them (a dummy root with two or more children).
///
/// With `group_by_subject` set, root threads whose normalized subjects
/// match are merged, compensating for missing or broken reference headers.
///
/// Root ordering is deterministic but not meaningful; use
/// [`sort_threads`] for presentation.
pub fn thread<P>(
    messages: impl IntoIterator<Item = Message<P>>,
    group_by_subject: bool,
) -> Forest<P> {
    let mut forest = Forest::new();

    // Working table: id -> container, insertion-ordered, scoped to this
    // call only.
    let mut id_table: IndexMap<String, ContainerId> = IndexMap::new();
    let mut count = 0usize;

    for msg in messages {
        count += 1;

        // step 1 (a): look up or create the container for this message.
        // A container created earlier as a reference placeholder keeps its
        // links; a duplicate id overwrites the stored message below.
        let this = match id_table.get(&msg.message_id) {
            Some(&id) => id,
            None => {
                let id = forest.alloc();
                id_table.insert(msg.message_id.clone(), id);
                id
            }
        };

        // step 1 (b): walk the references oldest-first, chaining each
        // consecutive pair as parent -> child.
        let mut prev: Option<ContainerId> = None;
        for reference in &msg.references {
            let container = match id_table.get(reference) {
                Some(&id) => id,
                None => {
                    let id = forest.alloc();
                    id_table.insert(reference.clone(), id);
                    id
                }
            };

            if let Some(prev_id) = prev {
                if forest.container(container).parent().is_some() {
                    // First-assigned link wins; later reference chains
                    // never override an established link.
                    trace!(reference = %reference, "skipping link: target already parented");
                } else if container == this
                    || forest.has_descendant(container, prev_id)
                    || forest.has_descendant(prev_id, container)
                {
                    trace!(reference = %reference, "skipping link: would create a cycle");
                } else {
                    forest.add_child(prev_id, container);
                }
            }
            prev = Some(container);
        }

        // step 1 (c): the last reference is the immediate parent. A
        // message with no references at all must not stay falsely
        // parented by an earlier, now-superseded inference.
        match prev {
            Some(prev_id) => {
                if prev_id != this && !forest.has_descendant(this, prev_id) {
                    forest.add_child(prev_id, this);
                }
            }
            None => {
                if let Some(parent) = forest.container(this).parent() {
                    forest.remove_child(parent, this);
                }
            }
        }

        forest.set_message(this, msg);
    }

    // step 2: the root set is every container with no parent, in table
    // order. step 3: the table is dropped here; nothing survives the call.
    let root_set: Vec<ContainerId> = id_table
        .values()
        .copied()
        .filter(|&id| forest.container(id).parent().is_none())
        .collect();
    drop(id_table);

    debug!(messages = count, roots = root_set.len(), "linked message set");

    // step 4: prune empty containers.
    let mut pruned: Vec<ContainerId> = Vec::new();
    for root in root_set {
        pruned.extend(prune_container(&mut forest, root));
    }
    debug!(roots = pruned.len(), "pruned root set");

    // step 5 (optional): group the root set by normalized subject.
    let roots = if group_by_subject {
        let grouped = group_root_set(&mut forest, &pruned);
        debug!(roots = grouped.len(), "grouped root set by subject");
        grouped
    } else {
        pruned
    };

    forest.set_roots(roots);
    forest
}

/// Prune a tree of containers.
///
/// Rewrites the subtree under `root` in place and returns the list of
/// containers that replace it: a childless dummy disappears, a dummy with
/// one child (or any dummy below the root) is replaced by its children,
/// anything else stays. Pruning an already-pruned tree is a no-op.
///
/// Implemented with an explicit work list over a reversed pre-order so
/// that long reply chains do not exhaust the call stack.
pub fn prune_container<P>(forest: &mut Forest<P>, root: ContainerId) -> Vec<ContainerId> {
    let order = forest.flatten(root);
    let mut replacements: HashMap<ContainerId, Vec<ContainerId>> =
        HashMap::with_capacity(order.len());

    // Reversed pre-order visits every child before its parent.
    for &id in order.iter().rev() {
        let original: Vec<ContainerId> = forest.container(id).children().to_vec();
        let mut new_children: Vec<ContainerId> = Vec::new();
        for child in original {
            forest.remove_child(id, child);
            new_children.extend(replacements.remove(&child).unwrap_or_default());
        }

        let replacement = if forest.container(id).is_dummy() && new_children.is_empty() {
            // step 4 (a): nuke empty containers.
            Vec::new()
        } else if forest.container(id).is_dummy() && (new_children.len() == 1 || id != root) {
            // step 4 (b): promote the children of useless dummies.
            new_children
        } else {
            for &child in &new_children {
                forest.add_child(id, child);
            }
            vec![id]
        };
        replacements.insert(id, replacement);
    }

    replacements.remove(&root).unwrap_or_default()
}

/// Normalized subject key for a root container, or `None` when the
/// container yields an empty key and is excluded from grouping.
fn subject_key<P>(forest: &Forest<P>, id: ContainerId) -> Option<String> {
    let raw = match forest.message(id) {
        Some(msg) => &msg.subject,
        None => {
            let &first = forest.container(id).children().first()?;
            &forest.message(first)?.subject
        }
    };
    let key = normalize_subject(raw);
    (!key.is_empty()).then_some(key)
}

/// Group the root set by normalized subject (step 5).
///
/// Returns the new root set: the distinct subject representatives in
/// representative-table order, followed by the roots whose normalized
/// subject was empty, untouched and in their original relative order.
fn group_root_set<P>(forest: &mut Forest<P>, root_set: &[ContainerId]) -> Vec<ContainerId> {
    let mut subject_table: IndexMap<String, ContainerId> = IndexMap::new();
    let mut ungrouped: Vec<ContainerId> = Vec::new();

    // step 5 (b): choose one representative per subject. A non-dummy
    // beats a dummy; between two messages, the shorter raw subject wins
    // (fewer reply markers, so treated as closer to the original post).
    for &container in root_set {
        let Some(key) = subject_key(forest, container) else {
            ungrouped.push(container);
            continue;
        };

        let replace = match subject_table.get(&key) {
            None => true,
            Some(&existing) => match (forest.message(existing), forest.message(container)) {
                (None, Some(_)) => true,
                (Some(old), Some(new)) => new.subject.len() < old.subject.len(),
                _ => false,
            },
        };
        if replace {
            subject_table.insert(key, container);
        }
    }

    // step 5 (c): merge every other root into its subject's
    // representative. Whenever a merge changes which container is the
    // root, the table is re-pointed so the final representatives really
    // are parentless.
    for &container in root_set {
        let Some(key) = subject_key(forest, container) else {
            continue;
        };
        let Some(&rep) = subject_table.get(&key) else {
            continue;
        };
        if rep == container {
            continue;
        }

        let rep_subject_len = forest.message(rep).map(|m| m.subject.len());
        let container_subject_len = forest.message(container).map(|m| m.subject.len());
        match (rep_subject_len, container_subject_len) {
            (None, None) => {
                // Two dummies: splice the children onto the representative.
                for child in forest.container(container).children().to_vec() {
                    forest.add_child(rep, child);
                }
            }
            (None, Some(_)) => {
                forest.add_child(rep, container);
            }
            (Some(_), None) => {
                forest.add_child(container, rep);
                subject_table.insert(key, container);
            }
            (Some(rep_len), Some(container_len)) => {
                if rep_len < container_len {
                    // The representative has fewer reply markers.
                    forest.add_child(rep, container);
                } else if rep_len > container_len {
                    forest.add_child(container, rep);
                    subject_table.insert(key, container);
                } else {
                    // Same amount of decoration: neither is the original,
                    // so a fresh dummy becomes the common parent.
                    let merged = forest.alloc();
                    forest.add_child(merged, rep);
                    forest.add_child(merged, container);
                    subject_table.insert(key, merged);
                }
            }
        }
    }

    let mut roots: Vec<ContainerId> = Vec::with_capacity(subject_table.len() + ungrouped.len());
    for &rep in subject_table.values() {
        debug_assert!(forest.container(rep).parent().is_none());
        roots.push(rep);
    }
    roots.extend(ungrouped);
    roots
}

/// Stable sort of the forest's root set.
///
/// `key` selects the message field to order by: `"message_id"` or
/// `"subject"`. A dummy root substitutes the `missing` sentinel for its
/// key. Equal keys keep their current relative order; `reverse` flips the
/// ordering without affecting stability.
///
/// # Errors
///
/// Returns [`Error::InvalidSortKey`] for any other key value.
pub fn sort_threads<P>(
    forest: &mut Forest<P>,
    key: &str,
    missing: &str,
    reverse: bool,
) -> Result<()> {
    if key != "message_id" && key != "subject" {
        return Err(Error::InvalidSortKey(key.to_string()));
    }

    let mut roots = forest.roots().to_vec();
    roots.sort_by(|&a, &b| {
        let ka = root_sort_key(forest, a, key, missing);
        let kb = root_sort_key(forest, b, key, missing);
        if reverse {
            kb.cmp(ka)
        } else {
            ka.cmp(kb)
        }
    });
    forest.set_roots(roots);
    Ok(())
}

fn root_sort_key<'a, P>(
    forest: &'a Forest<P>,
    id: ContainerId,
    key: &str,
    missing: &'a str,
) -> &'a str {
    match forest.message(id) {
        None => missing,
        Some(msg) if key == "subject" => &msg.subject,
        Some(msg) => &msg.message_id,
    }
}
