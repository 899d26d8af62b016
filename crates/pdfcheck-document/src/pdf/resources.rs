// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page resource lookup — resolve a page's (possibly inherited) /Resources
// dictionary and enumerate the image XObjects it references.

use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId};

/// Upper bound when walking /Parent chains or nested form XObjects.
const MAX_DEPTH: usize = 32;

/// Resolve `object` to a dictionary, following one level of indirection.
///
/// Streams resolve to their stream dictionary.
pub fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match object {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(&stream.dict),
            _ => None,
        },
        _ => None,
    }
}

/// Return the /Resources dictionary in effect for `page_id`.
///
/// Walks up the page tree when the page inherits its resources.
pub fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_DEPTH {
        if let Some(resources) = current
            .get(b"Resources")
            .ok()
            .and_then(|res| resolve_dict(doc, res))
        {
            return Some(resources);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Object ids of every image XObject used by `page_id`, in resource order.
///
/// Images drawn through form XObjects are included. Each id appears once.
pub fn page_image_ids(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let mut ids = Vec::new();
    let mut visited = HashSet::new();
    if let Some(resources) = page_resources(doc, page_id) {
        collect_images(doc, resources, &mut ids, &mut visited, 0);
    }
    ids
}

fn collect_images(
    doc: &Document,
    resources: &Dictionary,
    ids: &mut Vec<ObjectId>,
    visited: &mut HashSet<ObjectId>,
    depth: usize,
) {
    if depth > MAX_DEPTH {
        return;
    }
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
    else {
        return;
    };

    for (_name, entry) in xobjects.iter() {
        let Ok(id) = entry.as_reference() else {
            continue;
        };
        if !visited.insert(id) {
            continue;
        }
        let Ok(Object::Stream(stream)) = doc.get_object(id) else {
            continue;
        };
        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => ids.push(id),
            Ok(b"Form") => {
                if let Some(inner) = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|res| resolve_dict(doc, res))
                {
                    collect_images(doc, inner, ids, visited, depth + 1);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn lists_images_in_resource_order() {
        let bytes = fixtures::image_pdf(&[&[(8, 6), (4, 4)]]);
        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let ids = page_image_ids(&doc, page_id);
        assert_eq!(ids.len(), 2);
        assert!(ids[0].0 < ids[1].0);
    }

    #[test]
    fn text_page_has_no_images() {
        let bytes = fixtures::text_pdf(&["hello"]);
        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        assert!(page_image_ids(&doc, page_id).is_empty());
        assert!(page_resources(&doc, page_id).is_some());
    }

    #[test]
    fn inherited_resources_are_found() {
        let bytes = fixtures::image_pdf_with_inherited_resources((10, 10));
        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        assert_eq!(page_image_ids(&doc, page_id).len(), 1);
    }
}
