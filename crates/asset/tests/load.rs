use std::fs;
use std::path::{Path, PathBuf};

use asset::{
    AssetError, AssetResult, LoadedTexture, MeshLoader, TextureFormat, TextureHandle,
    TextureLoader, TextureRole, TextureTarget, Triangle,
};
use tempfile::TempDir;

#[derive(Default)]
struct CountingLoader {
    loaded: Vec<PathBuf>,
}

impl TextureLoader for CountingLoader {
    fn load_texture(&mut self, path: &Path) -> AssetResult<LoadedTexture> {
        self.loaded.push(path.to_path_buf());
        Ok(LoadedTexture {
            handle: TextureHandle(self.loaded.len() as u32),
            target: TextureTarget::Texture2D,
            format: TextureFormat::Rgba8,
        })
    }
}

/// Counts like [`CountingLoader`] but rejects every file named after `role`.
struct FailingLoader {
    role: &'static str,
    inner: CountingLoader,
    discarded: Vec<TextureHandle>,
}

impl FailingLoader {
    fn new(role: &'static str) -> Self {
        Self {
            role,
            inner: CountingLoader::default(),
            discarded: Vec::new(),
        }
    }
}

impl TextureLoader for FailingLoader {
    fn load_texture(&mut self, path: &Path) -> AssetResult<LoadedTexture> {
        if path.file_stem().is_some_and(|stem| stem == self.role) {
            return Err(AssetError::texture(path, "bad header"));
        }
        self.inner.load_texture(path)
    }

    fn discard(&mut self, handles: &[TextureHandle]) {
        self.discarded.extend_from_slice(handles);
    }
}

/// `Meshes/` and `Textures/` side by side, as the viewer expects them.
fn layout() -> (TempDir, PathBuf, PathBuf) {
    let root = tempfile::tempdir().expect("temp dir");
    let meshes = root.path().join("Meshes");
    let textures = root.path().join("Textures");
    fs::create_dir_all(&meshes).unwrap();
    fs::create_dir_all(&textures).unwrap();
    (root, meshes, textures)
}

fn add_mesh(meshes: &Path, textures: &Path, name: &str, obj: &str, roles: &[&str]) -> PathBuf {
    let path = meshes.join(format!("{name}.obj"));
    fs::write(&path, obj).unwrap();
    let dir = textures.join(name);
    fs::create_dir_all(&dir).unwrap();
    for role in roles {
        fs::write(dir.join(format!("{role}.dds")), b"").unwrap();
    }
    path
}

#[test]
fn single_triangle_end_to_end() {
    let (_root, meshes, textures) = layout();
    let path = add_mesh(
        &meshes,
        &textures,
        "tri",
        "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n",
        &["diffuse"],
    );

    let mut tex = CountingLoader::default();
    let mesh = MeshLoader::new(&textures).load(&path, &mut tex).unwrap();

    assert_eq!(mesh.name, "tri");
    assert_eq!(mesh.vertices().len(), 3);
    assert_eq!(mesh.triangles(), &[Triangle { indices: [0, 1, 2] }]);
    assert!(mesh.quads().is_empty());
    assert_eq!(mesh.textures.len(), 1);
    assert_eq!(mesh.textures[0].role, TextureRole::Diffuse);
    assert_eq!(mesh.textures[0].unit, Some(0));
}

#[test]
fn missing_texture_directory_fails_the_mesh() {
    let (_root, meshes, textures) = layout();
    let path = meshes.join("lonely.obj");
    fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

    let err = MeshLoader::new(&textures)
        .load(&path, &mut CountingLoader::default())
        .unwrap_err();
    assert!(matches!(err, AssetError::Io { .. }));
}

#[test]
fn missing_obj_is_io_error() {
    let (_root, meshes, textures) = layout();
    let err = MeshLoader::new(&textures)
        .load(&meshes.join("nope.obj"), &mut CountingLoader::default())
        .unwrap_err();
    match err {
        AssetError::Io { path, .. } => assert!(path.ends_with("nope.obj")),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn load_dir_skips_failures_and_keeps_order() {
    let (_root, meshes, textures) = layout();
    add_mesh(
        &meshes,
        &textures,
        "a_quad",
        "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n",
        &["diffuse", "normal", "specular"],
    );
    add_mesh(&meshes, &textures, "b_broken", "v 0 0 zero\n", &["diffuse"]);
    add_mesh(
        &meshes,
        &textures,
        "c_tri",
        "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n",
        &[],
    );

    let mut tex = CountingLoader::default();
    let loaded = MeshLoader::new(&textures)
        .load_dir(&meshes, &mut tex)
        .unwrap();

    let names: Vec<_> = loaded.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["a_quad", "c_tri"]);
    assert_eq!(loaded[0].quads().len(), 1);
    assert_eq!(loaded[0].textures.len(), 3);
    assert_eq!(loaded[1].triangles()[0].indices, [0, 1, 2]);
    assert!(loaded[1].textures.is_empty());
}

#[test]
fn load_dir_on_missing_directory_is_io_error() {
    let (root, _meshes, textures) = layout();
    let err = MeshLoader::new(&textures)
        .load_dir(&root.path().join("Elsewhere"), &mut CountingLoader::default())
        .unwrap_err();
    assert!(matches!(err, AssetError::Io { .. }));
}

#[test]
fn load_reader_resolves_textures_by_name() {
    let (_root, _meshes, textures) = layout();
    fs::create_dir_all(textures.join("streamed")).unwrap();
    fs::write(textures.join("streamed").join("specular.png"), b"").unwrap();

    let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
    let mut tex = CountingLoader::default();
    let mesh = MeshLoader::new(&textures)
        .load_reader("streamed", obj.as_bytes(), &mut tex)
        .unwrap();

    assert_eq!(mesh.name, "streamed");
    assert_eq!(mesh.quads().len(), 1);
    assert_eq!(mesh.textures[0].role, TextureRole::Specular);
    assert_eq!(mesh.textures[0].unit, Some(2));
    assert_eq!(tex.loaded.len(), 1);
}

#[test]
fn texture_failure_skips_only_its_mesh() {
    let (_root, meshes, textures) = layout();
    let tri = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
    add_mesh(&meshes, &textures, "a_plain", tri, &["diffuse"]);
    let bad = add_mesh(&meshes, &textures, "b_bad_normal", tri, &["diffuse", "normal"]);
    add_mesh(&meshes, &textures, "c_spec", tri, &["specular"]);

    let loader = MeshLoader::new(&textures);
    let mut tex = FailingLoader::new("normal");
    let loaded = loader.load_dir(&meshes, &mut tex).unwrap();

    let names: Vec<_> = loaded.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["a_plain", "c_spec"]);
    assert_eq!(loaded[1].textures[0].role, TextureRole::Specular);
    // The diffuse map of the failed mesh was handed back.
    assert_eq!(tex.discarded, vec![TextureHandle(2)]);

    let err = loader.load(&bad, &mut FailingLoader::new("normal")).unwrap_err();
    match err {
        AssetError::Texture { path, .. } => assert!(path.ends_with("normal.dds")),
        other => panic!("expected texture error, got {other:?}"),
    }
}
