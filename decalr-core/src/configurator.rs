//! The click → raycast → orient → validate → build pipeline
use std::sync::Arc;

use nalgebra::{Matrix4, Point3};

use crate::asset::{Texture, TextureRequest, TextureSource};
use crate::config::ConfiguratorConfig;
use crate::decal::{build_decal, resize_decal, set_decal_opacity, Decal};
use crate::error::{DecalError, Result};
use crate::footprint::DecalFootprint;
use crate::interaction::{Click, InteractionController};
use crate::orientation::solve_orientation;
use crate::projection::{Camera, ScreenPoint, Viewport};
use crate::ray::Ray;
use crate::raycast::{Raycaster, SurfaceHit};
use crate::scene::{Helper, NodeId, NodeKind, Scene, SceneNode};
use crate::validate::{compute_and_validate_corners, MarkerCollector, ValidationObserver};

/// Receives user-facing failures, e.g. to show a dialog
pub trait ErrorPresenter {
    fn present(&mut self, title: &str, description: &str);
}

/// Presenter that only logs
#[derive(Debug, Default)]
pub struct LogPresenter;

impl ErrorPresenter for LogPresenter {
    fn present(&mut self, title: &str, description: &str) {
        log::error!("{title}: {description}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecalId(u64);

#[derive(Debug)]
pub enum PlacementOutcome {
    Placed(DecalId),
    Rejected(DecalError),
}

/// A surface hit waiting for its texture
#[derive(Debug)]
struct PendingPlacement {
    target: NodeId,
    point: Point3<f32>,
    request: TextureRequest,
}

pub struct Configurator {
    config: ConfiguratorConfig,
    scene: Scene,
    model: Option<NodeId>,
    camera: Camera,
    viewport: Viewport,
    controller: InteractionController,
    decals: Vec<(DecalId, Decal)>,
    /// Debug marker nodes and the decal whose corners they mark
    markers: Vec<(DecalId, NodeId)>,
    next_decal: u64,
    pending: Vec<PendingPlacement>,
    textures: Box<dyn TextureSource>,
    presenter: Box<dyn ErrorPresenter>,
}

impl Configurator {
    pub fn new(
        config: ConfiguratorConfig,
        viewport: Viewport,
        textures: Box<dyn TextureSource>,
        presenter: Box<dyn ErrorPresenter>,
    ) -> Self {
        let mut scene = Scene::new();
        scene.add_light_rig(config.light_intensity, config.light_distance);
        scene.add_grid_helpers();

        Self {
            camera: config.camera.build(&viewport),
            controller: InteractionController::new(config.click_threshold_px),
            config,
            scene,
            model: None,
            viewport,
            decals: Vec::new(),
            markers: Vec::new(),
            next_decal: 1,
            pending: Vec::new(),
            textures,
            presenter,
        }
    }

    pub fn config(&self) -> &ConfiguratorConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.camera.set_viewport(&viewport);
        self.viewport = viewport;
    }

    /// Install the product model, replacing the previous one and its decals
    pub fn load_model(&mut self, node: SceneNode) -> NodeId {
        if let Some(old) = self.model.take() {
            self.scene.remove(old);
            self.decals.clear();
            self.pending.clear();
            for (_, marker) in std::mem::take(&mut self.markers) {
                self.scene.remove(marker);
            }
        }

        let model = SceneNode::group("model")
            .with_transform(self.config.model.transform())
            .with_child(node);
        let id = self.scene.add(model);
        self.model = Some(id);
        log::info!("model loaded");
        id
    }

    pub fn model(&self) -> Option<&SceneNode> {
        let (node, _) = self.scene.find(self.model?)?;
        Some(node)
    }

    pub fn decals(&self) -> impl Iterator<Item = (DecalId, &Decal)> {
        self.decals.iter().map(|(id, decal)| (*id, decal))
    }

    pub fn decal(&self, id: DecalId) -> Option<&Decal> {
        self.decals.iter().find(|(d, _)| *d == id).map(|(_, decal)| decal)
    }

    pub fn last_decal(&self) -> Option<DecalId> {
        self.decals.last().map(|(id, _)| *id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Corner markers left by validation when `debug_markers` is on
    pub fn markers(&self) -> impl Iterator<Item = Point3<f32>> + '_ {
        self.scene.nodes.iter().filter_map(|node| match node.kind {
            NodeKind::Helper(Helper::Marker { .. }) => {
                Some(node.transform.transform_point(&Point3::origin()))
            }
            _ => None,
        })
    }

    /// Tint every model mesh named `name`; reports `ObjectNotFound` when none match
    pub fn set_part_color(&mut self, name: &str, color: [u8; 3]) -> Result<()> {
        let matched = match self.model {
            Some(model) => self
                .scene
                .find_mut(model)
                .map_or(0, |node| node.recolor_meshes(name, color)),
            None => 0,
        };
        if matched == 0 {
            let err = DecalError::ObjectNotFound(name.to_string());
            self.report(&err);
            return Err(err);
        }
        log::info!("set colour of {matched} mesh(es) named '{name}' to {color:?}");
        Ok(())
    }

    /// First mesh on the line of sight from the camera through `point`
    pub fn find_mesh_at(&self, point: &Point3<f32>) -> Result<Option<SurfaceHit<'_>>> {
        let ray = Ray::through(self.camera.position, *point)?;
        Ok(Raycaster::new().cast_ray(&ray, &self.scene.nodes, true))
    }

    pub fn pointer_down(&mut self, position: ScreenPoint) {
        self.controller.pointer_down(position);
    }

    /// Finish a gesture; a click starts a placement when it lands on the model
    pub fn pointer_up(&mut self, position: ScreenPoint) -> Option<Click> {
        let click = self.controller.pointer_up(position)?;
        self.handle_click(&click);
        Some(click)
    }

    /// Returns whether the click hit the model and a texture was requested
    pub fn handle_click(&mut self, click: &Click) -> bool {
        let picked = self
            .pick(&click.position)
            .map(|hit| hit.map(|hit| (hit.target.id(), hit.point)));
        let (target, point) = match picked {
            Ok(Some(found)) => found,
            Ok(None) => {
                log::debug!("click at {:?} hit nothing", click.position);
                return false;
            }
            Err(err) => {
                self.report(&err);
                return false;
            }
        };

        log::debug!("click hit model at {point:?}, camera at {:?}", self.camera.position);
        let request = self.textures.request(&self.config.decal.texture);
        self.pending.push(PendingPlacement {
            target,
            point,
            request,
        });
        true
    }

    /// Surface of the product model under a canvas position.
    ///
    /// Only the model is searched; helpers and lights cannot be picked.
    pub fn pick(&self, position: &ScreenPoint) -> Result<Option<SurfaceHit<'_>>> {
        let Some(model) = self.model() else {
            return Ok(None);
        };
        let ray = self.camera.screen_to_ray(position, &self.viewport)?;

        // Children are searched with the group's transform applied.
        let hit = Raycaster::new().cast_ray(&ray, std::slice::from_ref(model), true);
        Ok(hit)
    }

    /// Run every placement whose texture has arrived
    pub fn poll(&mut self) -> Vec<PlacementOutcome> {
        let mut ready = Vec::new();
        self.pending.retain(|pending| match pending.request.try_take() {
            Some(result) => {
                log::debug!("texture '{}' resolved", pending.request.path());
                ready.push((pending.target, pending.point, result));
                false
            }
            None => true,
        });

        ready
            .into_iter()
            .map(|(target, point, result)| {
                let placed = result
                    .map_err(DecalError::from)
                    .and_then(|texture| self.place(target, point, texture));
                match placed {
                    Ok(id) => PlacementOutcome::Placed(id),
                    Err(err) => {
                        self.report(&err);
                        PlacementOutcome::Rejected(err)
                    }
                }
            })
            .collect()
    }

    /// Orient, validate and build a decal at `point` on mesh `target`
    pub fn place(&mut self, target: NodeId, point: Point3<f32>, texture: Arc<Texture>) -> Result<DecalId> {
        let settings = &self.config.decal;
        let instance = self
            .scene
            .mesh_instance(target)
            .ok_or_else(|| DecalError::NotAMesh(format!("{target:?}")))??;

        let orientation = solve_orientation(&point, &self.camera.position, settings.rotation_degrees)?;
        let footprint = DecalFootprint::new(point, orientation, settings.size())?;

        let mut collector = MarkerCollector::default();
        let observer = self
            .config
            .debug_markers
            .then_some(&mut collector as &mut dyn ValidationObserver);
        let Some(corners) = compute_and_validate_corners(&instance, &footprint, observer) else {
            log::warn!("intersection is not possible for these parameters");
            return Err(DecalError::ProjectionInfeasible);
        };

        let decal = build_decal(
            &instance,
            texture,
            &corners,
            settings.opacity,
            settings.opacity_policy,
        )?;

        let id = DecalId(self.next_decal);
        self.next_decal += 1;
        for marker in collector.markers {
            let node = self.scene.add(
                SceneNode::new("corner-marker", NodeKind::Helper(Helper::Marker { radius: 0.05 }))
                    .with_transform(Matrix4::new_translation(&marker.coords)),
            );
            self.markers.push((id, node));
        }

        log::info!("placed decal {id:?} at {point:?}");
        self.decals.push((id, decal));
        Ok(id)
    }

    pub fn resize_decal(&mut self, id: DecalId, width: f32, height: f32) -> Result<()> {
        let mode = self.config.decal.resize_mode;
        let decal = self.decal_mut(id)?;
        resize_decal(decal, width, height, mode)
    }

    pub fn set_decal_opacity(&mut self, id: DecalId, opacity: f32) -> Result<()> {
        let policy = self.config.decal.opacity_policy;
        let decal = self.decal_mut(id)?;
        set_decal_opacity(decal, opacity, policy)
    }

    /// Remove a decal together with its corner markers
    pub fn remove_decal(&mut self, id: DecalId) -> Option<Decal> {
        let index = self.decals.iter().position(|(d, _)| *d == id)?;
        let scene = &mut self.scene;
        self.markers.retain(|(owner, marker)| {
            if *owner == id {
                scene.remove(*marker);
            }
            *owner != id
        });
        Some(self.decals.remove(index).1)
    }

    fn decal_mut(&mut self, id: DecalId) -> Result<&mut Decal> {
        self.decals
            .iter_mut()
            .find(|(d, _)| *d == id)
            .map(|(_, decal)| decal)
            .ok_or_else(|| DecalError::InvalidFootprint(format!("no decal {id:?}")))
    }

    fn report(&mut self, err: &DecalError) {
        self.presenter.present(err.title(), &err.to_string());
    }
}
