use super::{Mesh, MeshPlacement, Triangle};
use crate::error::{CaseError, Result};
use crate::global_variables::*;
use glam::DVec3;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

const HEADER_BYTES: usize = 80;

const TRIANGLE_BYTES: usize = 50;

pub trait MeshLoader {
    fn load(&self, path: &Path, placement: &MeshPlacement) -> Result<Mesh>;
}

#[derive(Copy, Clone, Debug, Default)]
pub struct StlLoader;

impl MeshLoader for StlLoader {
    fn load(&self, path: &Path, placement: &MeshPlacement) -> Result<Mesh> {
        let bytes = fs::read(path).map_err(|e| CaseError::geometry(path, e.to_string()))?;
        let triangles = decode_binary_stl(&bytes).map_err(|reason| CaseError::geometry(path, reason))?;
        debug!(
            path = %path.display(),
            triangles = triangles.len(),
            "read binary stl"
        );
        let mut mesh = Mesh::new(triangles);
        mesh.place(placement);
        Ok(mesh)
    }
}

fn decode_binary_stl(bytes: &[u8]) -> std::result::Result<Vec<Triangle>, String> {
    if bytes.len() < HEADER_BYTES + 4 {
        return Err(format!("file has {} bytes, too short for an STL header", bytes.len()));
    }
    let count_bytes: [u8; 4] = bytes[HEADER_BYTES..HEADER_BYTES + 4]
        .try_into()
        .map_err(|_| String::from("unreadable triangle count"))?;
    let number_of_triangles = u32::from_le_bytes(count_bytes) as usize;
    let expected = HEADER_BYTES + 4 + number_of_triangles * TRIANGLE_BYTES;
    if bytes.len() != expected {
        if bytes.starts_with(b"solid") {
            return Err(String::from("ASCII STL is not supported, export the mesh as binary STL"));
        }
        return Err(format!(
            "expected {expected} bytes for {number_of_triangles} triangles, found {}",
            bytes.len()
        ));
    }
    if number_of_triangles == 0 {
        return Err(String::from("mesh has no triangles"));
    }
    let read_vertex = |chunk: &[u8]| {
        let mut xyz = [0.0; D];
        for (value, raw) in xyz.iter_mut().zip(chunk.chunks_exact(4)) {
            *value = f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as Float;
        }
        DVec3::from_array(xyz)
    };
    let triangles = bytes[HEADER_BYTES + 4..]
        .chunks_exact(TRIANGLE_BYTES)
        .map(|record| {
            // the stored normal (first 12 bytes) is recomputed from the winding
            Triangle::new(
                read_vertex(&record[12..24]),
                read_vertex(&record[24..36]),
                read_vertex(&record[36..48]),
            )
        })
        .collect();
    Ok(triangles)
}

pub fn encode_binary_stl(mesh: &Mesh) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_BYTES + 4 + mesh.number_of_triangles() * TRIANGLE_BYTES);
    let mut header = [b' '; HEADER_BYTES];
    header[..8].copy_from_slice(b"lbm_case");
    bytes.extend_from_slice(&header);
    bytes.extend_from_slice(&(mesh.number_of_triangles() as u32).to_le_bytes());
    for triangle in mesh.triangles() {
        let normal = triangle.normal();
        for vector in std::iter::once(&normal).chain(triangle.vertices.iter()) {
            for value in vector.to_array() {
                bytes.extend_from_slice(&(value as f32).to_le_bytes());
            }
        }
        bytes.extend_from_slice(&0u16.to_le_bytes());
    }
    bytes
}

pub fn write_stl<P>(mesh: &Mesh, path: P) -> io::Result<()>
where
    P: AsRef<Path>,
{
    let mut file = File::create(path)?;
    file.write_all(&encode_binary_stl(mesh))?;
    Ok(())
}
