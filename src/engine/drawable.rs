//! Polymorphic drawable dispatch: resolving a drawable's geometry for
//! spatial sort, and visiting one drawable (as a floating object or as an
//! inline attachment) by downcasting on its registered type code.

use crate::engine::Engine;
use crate::engine::table;
use crate::engine::text;
use crate::error::Result;
use crate::object_store::Reference;
use crate::protos::{tsch, tsd, tst};
use crate::registry::DrawableKind;
use crate::visitor::{Geometry, ImageInfo, MediaInfo, Object3DInfo, TableInfo, Visitor};

fn geometry_reference(engine: &Engine, id: u64, kind: DrawableKind) -> Option<crate::protos::tsp::Reference> {
    match kind {
        DrawableKind::Shape => engine.store.get::<tsd::ShapeArchive>(id)?.geometry,
        DrawableKind::Image => engine.store.get::<tsd::ImageArchive>(id)?.geometry,
        DrawableKind::Movie => engine.store.get::<tsd::MovieArchive>(id)?.geometry,
        DrawableKind::Object3D => engine.store.get::<tsd::Object3DArchive>(id)?.geometry,
        DrawableKind::Group => engine.store.get::<tsd::GroupArchive>(id)?.geometry,
        DrawableKind::Placeholder => engine.store.get::<tsd::PlaceholderArchive>(id)?.geometry,
        DrawableKind::Chart => engine.store.get::<tsch::ChartArchive>(id)?.geometry,
        DrawableKind::Table => engine.store.get::<tst::TableModelArchive>(id)?.geometry,
    }
}

/// Resolve a drawable's [`Geometry`], or `None` if the id, its kind, or
/// its geometry reference fails to resolve.
pub(crate) fn resolve_geometry(engine: &Engine, id: u64) -> Option<Geometry> {
    let kind = DrawableKind::from_type_code(engine.store.type_code_of(id)?)?;
    let geometry_ref = geometry_reference(engine, id, kind)?;
    let archive = engine.store.deref::<tsd::GeometryArchive>(Reference::from(geometry_ref.identifier))?;
    Some(Geometry {
        position: archive.position.as_ref().map(crate::path::Point::from).unwrap_or_default(),
        size: archive.size.as_ref().map(crate::path::Size::from).unwrap_or_default(),
        angle: archive.angle.unwrap_or(0.0),
        flipped_horizontal: archive.flipped_horizontal.unwrap_or(false),
        flipped_vertical: archive.flipped_vertical.unwrap_or(false),
    })
}

fn frame_center(geometry: &Geometry) -> (f64, f64) {
    (
        geometry.position.y + geometry.size.height / 2.0,
        geometry.position.x + geometry.size.width / 2.0,
    )
}

/// Order `ids` by ascending frame-center `y`, ties broken by ascending
/// frame-center `x`. A drawable whose geometry fails to resolve sorts to
/// the origin rather than being dropped.
pub(crate) fn spatial_order(engine: &Engine, ids: &[u64]) -> Vec<u64> {
    let mut with_centers: Vec<(u64, (f64, f64))> = ids
        .iter()
        .map(|&id| (id, resolve_geometry(engine, id).map(|g| frame_center(&g)).unwrap_or((0.0, 0.0))))
        .collect();
    with_centers.sort_by(|a, b| {
        a.1.0
            .partial_cmp(&b.1.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.1.partial_cmp(&b.1.1).unwrap_or(std::cmp::Ordering::Equal))
    });
    with_centers.into_iter().map(|(id, _)| id).collect()
}

fn data_path(engine: &Engine, data: &Option<crate::protos::tsp::DataReference>) -> Option<String> {
    let identifier = data.as_ref()?.identifier;
    engine.metadata.resolve_data_path(identifier, engine.storage)
}

/// Visit one floating drawable (top-level image/shape/table/etc. on a
/// page, sheet, or slide), dispatching to the matching visitor events.
/// A drawable whose id or type code doesn't resolve is skipped silently.
pub(crate) async fn visit_floating<V: Visitor>(engine: &Engine<'_>, visitor: &mut V, id: u64) -> Result<()> {
    let Some(type_code) = engine.store.type_code_of(id) else { return Ok(()) };
    let Some(kind) = DrawableKind::from_type_code(type_code) else { return Ok(()) };

    match kind {
        DrawableKind::Shape => visit_shape(engine, visitor, id).await?,
        DrawableKind::Group => visit_group(engine, visitor, id).await?,
        DrawableKind::Placeholder => visit_placeholder(engine, visitor, id).await?,
        DrawableKind::Table => table::visit(engine, visitor, id).await?,
        DrawableKind::Image => {
            if let Some(archive) = engine.store.get::<tsd::ImageArchive>(id) {
                let info = ImageInfo {
                    geometry: resolve_geometry(engine, id).unwrap_or_default(),
                    data_path: data_path(engine, &archive.data),
                    ocr: None,
                };
                visitor.image(&info).await?;
            }
        },
        DrawableKind::Movie => {
            if let Some(archive) = engine.store.get::<tsd::MovieArchive>(id) {
                let info = MediaInfo {
                    geometry: resolve_geometry(engine, id).unwrap_or_default(),
                    data_path: data_path(engine, &archive.movie_data),
                };
                visitor.media(&info).await?;
            }
        },
        DrawableKind::Object3D => {
            if let Some(archive) = engine.store.get::<tsd::Object3DArchive>(id) {
                let info = Object3DInfo {
                    geometry: resolve_geometry(engine, id).unwrap_or_default(),
                    data_path: data_path(engine, &archive.model_data),
                };
                visitor.object_3d(&info).await?;
            }
        },
        DrawableKind::Chart => {
            if let Some(info) = resolve_chart(engine, id) {
                visitor.chart(&info).await?;
            }
        },
    }
    Ok(())
}

/// Visit one drawable referenced as an inline attachment inside a
/// paragraph's merge stream. Shapes and tables get their own boundary
/// events; everything else is a single [`crate::visitor::InlineElement`].
pub(crate) async fn visit_attachment<V: Visitor>(engine: &Engine<'_>, visitor: &mut V, id: u64) -> Result<()> {
    let Some(type_code) = engine.store.type_code_of(id) else { return Ok(()) };
    let Some(kind) = DrawableKind::from_type_code(type_code) else { return Ok(()) };

    match kind {
        DrawableKind::Shape | DrawableKind::Placeholder => visit_shape(engine, visitor, id).await?,
        DrawableKind::Group => visit_group(engine, visitor, id).await?,
        DrawableKind::Table => table::visit(engine, visitor, id).await?,
        DrawableKind::Image => {
            if let Some(archive) = engine.store.get::<tsd::ImageArchive>(id) {
                let info = ImageInfo {
                    geometry: resolve_geometry(engine, id).unwrap_or_default(),
                    data_path: data_path(engine, &archive.data),
                    ocr: None,
                };
                visitor.inline_element(crate::visitor::InlineElement::Image(info)).await?;
            }
        },
        DrawableKind::Movie => {
            if let Some(archive) = engine.store.get::<tsd::MovieArchive>(id) {
                let info = MediaInfo {
                    geometry: resolve_geometry(engine, id).unwrap_or_default(),
                    data_path: data_path(engine, &archive.movie_data),
                };
                visitor.inline_element(crate::visitor::InlineElement::Media(info)).await?;
            }
        },
        DrawableKind::Object3D => {
            if let Some(archive) = engine.store.get::<tsd::Object3DArchive>(id) {
                let info = Object3DInfo {
                    geometry: resolve_geometry(engine, id).unwrap_or_default(),
                    data_path: data_path(engine, &archive.model_data),
                };
                visitor.inline_element(crate::visitor::InlineElement::Object3D(info)).await?;
            }
        },
        DrawableKind::Chart => {
            if let Some(info) = resolve_chart(engine, id) {
                visitor.inline_element(crate::visitor::InlineElement::Chart(info)).await?;
            }
        },
    }
    Ok(())
}

async fn visit_shape<V: Visitor>(engine: &Engine<'_>, visitor: &mut V, id: u64) -> Result<()> {
    // A placeholder carries its body storage under `body` rather than
    // `text_storage`; both wrap it in the same shape-begin/end pair since
    // neither has a dedicated event of its own.
    let (geometry, text_storage) = if let Some(shape) = engine.store.get::<tsd::ShapeArchive>(id) {
        (resolve_geometry(engine, id).unwrap_or_default(), shape.text_storage)
    } else if let Some(placeholder) = engine.store.get::<tsd::PlaceholderArchive>(id) {
        (resolve_geometry(engine, id).unwrap_or_default(), placeholder.body)
    } else {
        return Ok(());
    };

    visitor.shape_begin(geometry).await?;
    if let Some(storage_ref) = text_storage {
        text::traverse_storage(engine, visitor, storage_ref.identifier, &mut super::ListCounters::new()).await?;
    }
    visitor.shape_end().await
}

async fn visit_placeholder<V: Visitor>(engine: &Engine<'_>, visitor: &mut V, id: u64) -> Result<()> {
    visit_shape(engine, visitor, id).await
}

async fn visit_group<V: Visitor>(engine: &Engine<'_>, visitor: &mut V, id: u64) -> Result<()> {
    let Some(group) = engine.store.get::<tsd::GroupArchive>(id) else { return Ok(()) };
    let geometry = resolve_geometry(engine, id).unwrap_or_default();
    visitor.group_begin(geometry).await?;
    for child in &group.children {
        Box::pin(visit_floating(engine, visitor, child.identifier)).await?;
    }
    visitor.group_end().await
}

fn resolve_chart(engine: &Engine, id: u64) -> Option<crate::visitor::ChartInfo> {
    let archive = engine.store.get::<tsch::ChartArchive>(id)?;
    let series = archive
        .series
        .iter()
        .map(|s| crate::visitor::ChartSeries { name: s.name.clone(), values: s.values.clone() })
        .collect();
    let axes = archive
        .axes
        .iter()
        .map(|a| crate::visitor::ChartAxis {
            is_value_axis: a.axis_kind == Some(1),
            title: a.title.clone(),
            category_labels: a.category_labels.clone(),
        })
        .collect();
    let legend = archive.legend.as_ref().map(|l| crate::visitor::ChartLegend { visible: l.visible.unwrap_or(false) });
    Some(crate::visitor::ChartInfo { title: archive.title.clone(), series, axes, legend })
}

/// Build the [`TableInfo`] header for a table drawable's `table-begin`
/// event; shared by [`table::visit`] so drawable dispatch and the table
/// walk agree on one construction path.
pub(crate) fn table_info(engine: &Engine, id: u64, archive: &tst::TableModelArchive) -> TableInfo {
    TableInfo {
        name: archive.name.clone(),
        row_count: archive.num_rows.unwrap_or(0),
        column_count: archive.num_cols.unwrap_or(0),
        geometry: resolve_geometry(engine, id).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{build_store, record};
    use crate::metadata::Metadata;
    use crate::protos::tsp;

    fn image_with_geometry(image_id: u64, geometry_id: u64, x: f64, y: f64, w: f64, h: f64) -> Vec<crate::engine::test_support::Record> {
        vec![
            record(
                image_id,
                crate::registry::type_code::IMAGE,
                &tsd::ImageArchive {
                    geometry: Some(tsp::Reference { identifier: geometry_id, type_hint: None }),
                    ..Default::default()
                },
            ),
            record(
                geometry_id,
                crate::registry::type_code::GEOMETRY,
                &tsd::GeometryArchive {
                    position: Some(tsp::Point { x: Some(x), y: Some(y) }),
                    size: Some(tsp::Size { width: Some(w), height: Some(h) }),
                    ..Default::default()
                },
            ),
        ]
    }

    #[test]
    fn spatial_order_sorts_by_frame_center_y_then_x() {
        // Spec §8 scenario 5: three drawables with frame centers
        // (100,50), (10,200), (200,50) emit in order
        // [(100,50), (200,50), (10,200)].
        let mut records = Vec::new();
        records.extend(image_with_geometry(1, 11, 100.0, 50.0, 0.0, 0.0));
        records.extend(image_with_geometry(2, 12, 10.0, 200.0, 0.0, 0.0));
        records.extend(image_with_geometry(3, 13, 200.0, 50.0, 0.0, 0.0));

        let store = build_store(records);
        let metadata = Metadata::default();
        struct NoStorage;
        impl PackageStorage for NoStorage {
            fn contains(&self, _: &str) -> bool {
                false
            }
            fn read(&self, _: &str) -> crate::error::Result<Vec<u8>> {
                unreachable!()
            }
            fn size(&self, _: &str) -> crate::error::Result<u64> {
                unreachable!()
            }
            fn iter_entries(&self) -> Vec<String> {
                vec![]
            }
        }
        use crate::package::PackageStorage;
        let storage = NoStorage;
        let engine = Engine::new(&store, &metadata, &storage);

        let ordered = spatial_order(&engine, &[1, 2, 3]);
        assert_eq!(ordered, vec![1, 3, 2]);
    }

    #[test]
    fn unresolvable_drawable_sorts_to_origin() {
        let store = build_store(image_with_geometry(1, 11, 50.0, 50.0, 0.0, 0.0));
        let metadata = Metadata::default();
        struct NoStorage;
        impl crate::package::PackageStorage for NoStorage {
            fn contains(&self, _: &str) -> bool {
                false
            }
            fn read(&self, _: &str) -> crate::error::Result<Vec<u8>> {
                unreachable!()
            }
            fn size(&self, _: &str) -> crate::error::Result<u64> {
                unreachable!()
            }
            fn iter_entries(&self) -> Vec<String> {
                vec![]
            }
        }
        let storage = NoStorage;
        let engine = Engine::new(&store, &metadata, &storage);

        // id 999 doesn't resolve at all; sorts to the origin (0,0), ahead
        // of the real drawable whose center is (50,50).
        let ordered = spatial_order(&engine, &[1, 999]);
        assert_eq!(ordered, vec![999, 1]);
    }
}
