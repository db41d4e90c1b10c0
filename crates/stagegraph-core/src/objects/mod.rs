//! Stage objects: entities placed on the canvas and the associations between them.

mod edge;
mod image_node;
mod pen_stroke;
mod section;
mod text_node;

pub use edge::{Edge, MultiTargetUndirectedEdge};
pub use image_node::{ImageNode, SvgNode};
pub use pen_stroke::PenStroke;
pub use section::Section;
pub use text_node::{SizeAdjust, TextNode};

use crate::collision::CollisionBox;
use kurbo::Vec2;
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for stage objects.
pub type ObjectId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl StageColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }
}

impl From<Color> for StageColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::new(rgba.r, rgba.g, rgba.b, rgba.a)
    }
}

impl From<StageColor> for Color {
    fn from(color: StageColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Behaviour shared by every entity variant.
pub trait EntityTrait {
    fn id(&self) -> ObjectId;

    /// Own collision box. Sections report their fixed rectangle here; the
    /// stage derives the expanded box from the children.
    fn collision_box(&self) -> CollisionBox;

    fn translate(&mut self, delta: Vec2);

    fn is_selected(&self) -> bool;

    fn set_selected(&mut self, selected: bool);
}

/// Placeable stage object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entity {
    TextNode(TextNode),
    ImageNode(ImageNode),
    SvgNode(SvgNode),
    Section(Section),
    PenStroke(PenStroke),
}

impl Entity {
    pub fn id(&self) -> ObjectId {
        match self {
            Entity::TextNode(e) => e.id(),
            Entity::ImageNode(e) => e.id(),
            Entity::SvgNode(e) => e.id(),
            Entity::Section(e) => e.id(),
            Entity::PenStroke(e) => e.id(),
        }
    }

    pub fn collision_box(&self) -> CollisionBox {
        match self {
            Entity::TextNode(e) => e.collision_box(),
            Entity::ImageNode(e) => e.collision_box(),
            Entity::SvgNode(e) => e.collision_box(),
            Entity::Section(e) => e.collision_box(),
            Entity::PenStroke(e) => e.collision_box(),
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Entity::TextNode(e) => e.translate(delta),
            Entity::ImageNode(e) => e.translate(delta),
            Entity::SvgNode(e) => e.translate(delta),
            Entity::Section(e) => e.translate(delta),
            Entity::PenStroke(e) => e.translate(delta),
        }
    }

    pub fn is_selected(&self) -> bool {
        match self {
            Entity::TextNode(e) => e.is_selected(),
            Entity::ImageNode(e) => e.is_selected(),
            Entity::SvgNode(e) => e.is_selected(),
            Entity::Section(e) => e.is_selected(),
            Entity::PenStroke(e) => e.is_selected(),
        }
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        match self {
            Entity::TextNode(e) => e.set_selected(selected),
            Entity::ImageNode(e) => e.set_selected(selected),
            Entity::SvgNode(e) => e.set_selected(selected),
            Entity::Section(e) => e.set_selected(selected),
            Entity::PenStroke(e) => e.set_selected(selected),
        }
    }

    /// Whether edges may attach to this entity.
    pub fn is_connectable(&self) -> bool {
        match self {
            Entity::TextNode(_) | Entity::ImageNode(_) | Entity::SvgNode(_) | Entity::Section(_) => {
                true
            }
            Entity::PenStroke(_) => false,
        }
    }

    pub fn is_resizable(&self) -> bool {
        match self {
            Entity::TextNode(_) | Entity::ImageNode(_) | Entity::SvgNode(_) => true,
            Entity::Section(_) | Entity::PenStroke(_) => false,
        }
    }

    /// Display label, used for tag listings.
    pub fn label(&self) -> &str {
        match self {
            Entity::TextNode(e) => &e.text,
            Entity::ImageNode(e) => &e.source,
            Entity::SvgNode(_) => "svg",
            Entity::Section(e) => &e.text,
            Entity::PenStroke(_) => "stroke",
        }
    }

    pub fn as_section(&self) -> Option<&Section> {
        match self {
            Entity::Section(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn as_section_mut(&mut self) -> Option<&mut Section> {
        match self {
            Entity::Section(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn set_id(&mut self, id: ObjectId) {
        match self {
            Entity::TextNode(e) => e.id = id,
            Entity::ImageNode(e) => e.id = id,
            Entity::SvgNode(e) => e.id = id,
            Entity::Section(e) => e.id = id,
            Entity::PenStroke(e) => e.id = id,
        }
    }
}

/// Relationship object referencing entities by uuid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Association {
    Edge(Edge),
    MultiTargetUndirectedEdge(MultiTargetUndirectedEdge),
}

impl Association {
    pub fn id(&self) -> ObjectId {
        match self {
            Association::Edge(e) => e.id,
            Association::MultiTargetUndirectedEdge(e) => e.id,
        }
    }

    /// Every entity this association points at.
    pub fn targets(&self) -> Vec<ObjectId> {
        match self {
            Association::Edge(e) => vec![e.from, e.to],
            Association::MultiTargetUndirectedEdge(e) => e.targets.clone(),
        }
    }

    pub fn references(&self, entity: ObjectId) -> bool {
        match self {
            Association::Edge(e) => e.from == entity || e.to == entity,
            Association::MultiTargetUndirectedEdge(e) => e.targets.contains(&entity),
        }
    }

    pub fn is_selected(&self) -> bool {
        match self {
            Association::Edge(e) => e.is_selected,
            Association::MultiTargetUndirectedEdge(e) => e.is_selected,
        }
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        match self {
            Association::Edge(e) => e.is_selected = selected,
            Association::MultiTargetUndirectedEdge(e) => e.is_selected = selected,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Association::Edge(e) => &e.text,
            Association::MultiTargetUndirectedEdge(e) => &e.text,
        }
    }

    pub(crate) fn set_id(&mut self, id: ObjectId) {
        match self {
            Association::Edge(e) => e.id = id,
            Association::MultiTargetUndirectedEdge(e) => e.id = id,
        }
    }

    /// Replace every reference to `old` by `new`.
    pub(crate) fn retarget(&mut self, old: ObjectId, new: ObjectId) {
        match self {
            Association::Edge(e) => {
                if e.from == old {
                    e.from = new;
                }
                if e.to == old {
                    e.to = new;
                }
            }
            Association::MultiTargetUndirectedEdge(e) => {
                for target in &mut e.targets {
                    if *target == old {
                        *target = new;
                    }
                }
            }
        }
    }
}

/// Any object living on the stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageObject {
    Entity(Entity),
    Association(Association),
}

impl StageObject {
    pub fn id(&self) -> ObjectId {
        match self {
            StageObject::Entity(e) => e.id(),
            StageObject::Association(a) => a.id(),
        }
    }

    pub fn is_selected(&self) -> bool {
        match self {
            StageObject::Entity(e) => e.is_selected(),
            StageObject::Association(a) => a.is_selected(),
        }
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        match self {
            StageObject::Entity(e) => e.set_selected(selected),
            StageObject::Association(a) => a.set_selected(selected),
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            StageObject::Entity(e) => Some(e),
            StageObject::Association(_) => None,
        }
    }

    pub fn as_association(&self) -> Option<&Association> {
        match self {
            StageObject::Association(a) => Some(a),
            StageObject::Entity(_) => None,
        }
    }
}

impl From<Entity> for StageObject {
    fn from(entity: Entity) -> Self {
        StageObject::Entity(entity)
    }
}

impl From<Association> for StageObject {
    fn from(association: Association) -> Self {
        StageObject::Association(association)
    }
}

pub(crate) fn new_id() -> ObjectId {
    Uuid::new_v4()
}
