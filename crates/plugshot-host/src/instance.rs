//! A hosted plugin instance: the processor component and its edit
//! controller, kept initialized together and torn down together.

use std::ffi::CString;

use tracing::debug;
use vst3_abi as abi;
use vst3_abi::{
    ComPtr, IComponent, IComponentHandler, IConnectionPoint, IEditController, TUID,
};

use crate::context::PluginContextGuard;
use crate::error::HostError;
use crate::module::{ClassId, VstModule};
use crate::view::EditorView;

pub struct PluginInstance {
    controller: ComPtr<IEditController>,
    component: ComPtr<IComponent>,
    handler: Option<ComPtr<IComponentHandler>>,
    shared_controller: bool,
    connected: bool,
    terminated: bool,
}

impl PluginInstance {
    /// Instantiates the effect class and brings up its edit controller.
    ///
    /// Single-component plugins implement `IEditController` on the
    /// processor object itself; those are detected with a query instead of
    /// a second `createInstance`, and the shared object is initialized and
    /// terminated exactly once.
    pub fn create(
        module: &VstModule,
        class: &ClassId,
        context: &PluginContextGuard,
    ) -> Result<Self, HostError> {
        let component: ComPtr<IComponent> =
            unsafe { module.create_instance(class) }.map_err(|rc| {
                HostError::ComponentInit(format!("createInstance failed (code {rc})"))
            })?;

        let rc = unsafe {
            (component.vtbl().base.initialize)(component.as_ptr().cast(), context.context_ptr())
        };
        if rc != abi::K_RESULT_OK {
            return Err(HostError::ComponentInit(format!(
                "component initialize failed (code {rc})"
            )));
        }

        let (controller, shared_controller) =
            match obtain_controller(module, &component, context) {
                Ok(pair) => pair,
                Err(err) => {
                    unsafe {
                        (component.vtbl().base.terminate)(component.as_ptr().cast());
                    }
                    return Err(err);
                }
            };

        // Split plugins expect the host to wire their connection points.
        // A shared object talks to itself, so skip it there.
        let connected = if shared_controller {
            false
        } else {
            connect_points(&component, &controller)
        };

        Ok(Self {
            controller,
            component,
            handler: None,
            shared_controller,
            connected,
            terminated: false,
        })
    }

    /// Hands the controller the host's component handler.
    pub fn set_handler(&mut self, handler: ComPtr<IComponentHandler>) {
        let rc = unsafe {
            (self.controller.vtbl().set_component_handler)(
                self.controller.as_ptr(),
                handler.as_ptr(),
            )
        };
        if rc != abi::K_RESULT_OK {
            debug!(code = rc, "controller refused the component handler");
        }
        self.handler = Some(handler);
    }

    /// Asks the controller for its editor view.
    pub fn create_view(&self) -> Result<EditorView, HostError> {
        let name = CString::new(abi::VIEW_TYPE_EDITOR)
            .expect("view type string must not contain null bytes");
        let raw = unsafe {
            (self.controller.vtbl().create_view)(self.controller.as_ptr(), name.as_ptr())
        };
        let view = unsafe { ComPtr::from_raw(raw) }.ok_or(HostError::NoEditorView)?;
        Ok(EditorView::new(view))
    }

    /// Disconnects and terminates both objects. Safe to call more than
    /// once; later calls are no-ops.
    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        if self.connected {
            disconnect_points(&self.component, &self.controller);
            self.connected = false;
        }

        if self.handler.take().is_some() {
            unsafe {
                (self.controller.vtbl().set_component_handler)(
                    self.controller.as_ptr(),
                    std::ptr::null_mut(),
                );
            }
        }

        if !self.shared_controller {
            let rc = unsafe {
                (self.controller.vtbl().base.terminate)(self.controller.as_ptr().cast())
            };
            if rc != abi::K_RESULT_OK {
                debug!(code = rc, "controller terminate reported an error");
            }
        }
        let rc =
            unsafe { (self.component.vtbl().base.terminate)(self.component.as_ptr().cast()) };
        if rc != abi::K_RESULT_OK {
            debug!(code = rc, "component terminate reported an error");
        }
        debug!("plugin instance terminated");
    }
}

impl Drop for PluginInstance {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn obtain_controller(
    module: &VstModule,
    component: &ComPtr<IComponent>,
    context: &PluginContextGuard,
) -> Result<(ComPtr<IEditController>, bool), HostError> {
    let mut controller_cid: TUID = [0; 16];
    let rc = unsafe {
        (component.vtbl().get_controller_class_id)(component.as_ptr(), &mut controller_cid)
    };
    if rc == abi::K_RESULT_OK {
        let class = ClassId::from_tuid(controller_cid);
        match unsafe { module.create_instance::<IEditController>(&class) } {
            Ok(controller) => {
                let rc = unsafe {
                    (controller.vtbl().base.initialize)(
                        controller.as_ptr().cast(),
                        context.context_ptr(),
                    )
                };
                if rc != abi::K_RESULT_OK {
                    return Err(HostError::ComponentInit(format!(
                        "controller initialize failed (code {rc})"
                    )));
                }
                debug!(class = %class, "using split edit controller");
                return Ok((controller, false));
            }
            Err(code) => {
                debug!(class = %class, code, "controller class not instantiable, querying the component");
            }
        }
    }

    match component.cast::<IEditController>() {
        Some(controller) => {
            debug!("component doubles as its own edit controller");
            Ok((controller, true))
        }
        None => Err(HostError::ComponentInit(
            "plugin exposes no edit controller".into(),
        )),
    }
}

fn connect_points(component: &ComPtr<IComponent>, controller: &ComPtr<IEditController>) -> bool {
    let (Some(from), Some(to)) = (
        component.cast::<IConnectionPoint>(),
        controller.cast::<IConnectionPoint>(),
    ) else {
        debug!("plugin exposes no connection points");
        return false;
    };
    unsafe {
        let rc = (from.vtbl().connect)(from.as_ptr(), to.as_ptr());
        if rc != abi::K_RESULT_OK {
            debug!(code = rc, "component connect reported an error");
        }
        let rc = (to.vtbl().connect)(to.as_ptr(), from.as_ptr());
        if rc != abi::K_RESULT_OK {
            debug!(code = rc, "controller connect reported an error");
        }
    }
    true
}

fn disconnect_points(component: &ComPtr<IComponent>, controller: &ComPtr<IEditController>) {
    let (Some(from), Some(to)) = (
        component.cast::<IConnectionPoint>(),
        controller.cast::<IConnectionPoint>(),
    ) else {
        return;
    };
    unsafe {
        (from.vtbl().disconnect)(from.as_ptr(), to.as_ptr());
        (to.vtbl().disconnect)(to.as_ptr(), from.as_ptr());
    }
}
