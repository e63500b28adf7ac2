#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use geo::{Coord, LineString, MultiLineString};
    use hydro_trace::{
        DelineationInputs, Error, FlowArea, GeoVectorOps, PixelCoord, Raster, RasterAccessor, Resolution,
        ResolutionChain, delineate, upstream_mask,
    };
    use ndarray::{Array2, array};

    fn d8(data: Array2<u8>) -> Raster<u8> {
        let rows = data.nrows() as f64;
        Raster::from_array(data, 0.0, rows, 1.0, 1.0, 255).expect("Failed to create raster")
    }

    fn grid(data: Array2<f64>) -> Raster<f64> {
        let rows = data.nrows() as f64;
        Raster::from_array(data, 0.0, rows, 1.0, 1.0, -1.0).expect("Failed to create raster")
    }

    /// Every cell drains towards the top left corner.
    fn towards_origin() -> Raster<u8> {
        d8(array![
            [16, 16, 16, 16],
            [64, 32, 32, 32],
            [64, 32, 32, 32],
            [64, 32, 32, 32],
        ])
    }

    #[test]
    fn test_whole_grid_drains_to_corner() {
        let raster = towards_origin();
        let mask = upstream_mask(&raster, &[PixelCoord::new(0, 0)]);
        assert_eq!(mask.count(), 16);
        assert!(mask.data().iter().all(|&v| v == 1));
        let cells = raster.metadata().width * raster.metadata().height;
        assert_eq!(mask.visited(), cells);
        // seeding every pixel cannot grow the visited set past the grid
        let all: Vec<PixelCoord> = (0..4).flat_map(|r| (0..4).map(move |c| PixelCoord::new(c, r))).collect();
        let mask = upstream_mask(&raster, &all);
        assert_eq!(mask.visited(), cells);
    }

    #[test]
    fn test_partial_basin() {
        let raster = towards_origin();
        // cell (col 1, row 1) only receives from (2, 2), which receives from (3, 3)
        let mask = upstream_mask(&raster, &[PixelCoord::new(1, 1)]);
        assert_eq!(mask.count(), 3);
        assert!(mask.is_set(PixelCoord::new(1, 1)));
        assert!(mask.is_set(PixelCoord::new(2, 2)));
        assert!(mask.is_set(PixelCoord::new(3, 3)));
        assert!(!mask.is_set(PixelCoord::new(0, 0)));
    }

    #[test]
    fn test_no_inflow_gives_single_pixel() {
        let raster = d8(Array2::zeros((5, 5)));
        let seed = PixelCoord::new(2, 3);
        let mask = upstream_mask(&raster, &[seed]);
        assert_eq!(mask.count(), 1);
        assert!(mask.is_set(seed));
    }

    #[test]
    fn test_neighbours_pointing_away_are_ignored() {
        // all cells drain east, so only the row to the west of the seed contributes
        let raster = d8(Array2::from_elem((3, 5), 1));
        let mask = upstream_mask(&raster, &[PixelCoord::new(3, 1)]);
        assert_eq!(mask.count(), 4);
        for col in 0..4 {
            assert!(mask.is_set(PixelCoord::new(col, 1)));
        }
        assert!(!mask.is_set(PixelCoord::new(4, 1)));
        assert!(mask.count() <= 3 * 5);
    }

    #[test]
    fn test_cyclic_data_terminates() {
        let raster = d8(array![[1, 4], [64, 16]]);
        let mask = upstream_mask(&raster, &[PixelCoord::new(0, 0)]);
        assert_eq!(mask.count(), 4);
        assert_eq!(mask.visited(), 4);
    }

    #[test]
    fn test_off_grid_seeds_are_ignored() {
        let raster = towards_origin();
        let mask = upstream_mask(&raster, &[PixelCoord::new(-1, 0), PixelCoord::new(4, 4)]);
        assert_eq!(mask.count(), 0);
    }

    #[test]
    fn test_delineate_from_origin_corner() {
        let chain = ResolutionChain::single(towards_origin());
        let accumulation = grid(Array2::from_elem((4, 4), 100.0));
        let inputs = DelineationInputs {
            flow_direction: &chain,
            flow_accumulation: &accumulation,
            accum_threshold: 20.0,
            flow_area: None,
        };
        // exactly on the upper left corner of the grid
        let ws = delineate(Coord { x: 0.0, y: 4.0 }, &inputs, &GeoVectorOps).unwrap();
        assert_eq!(ws.seeds, vec![PixelCoord::new(0, 0)]);
        assert_eq!(ws.cell_count(), 16);
        assert_eq!(ws.resolution, Resolution::Fallback);
        assert_eq!(ws.polygons.0.len(), 1);
        assert_eq!(ws.rings().count(), 1);
        assert_relative_eq!(ws.area(), 16.0);
        assert_relative_eq!(ws.perimeter(), 16.0);
    }

    #[test]
    fn test_accumulation_decides_resolution() {
        // high resolution 0.5 cells over the left half of the coarse grid, all draining west
        let high = Raster::from_array(Array2::from_elem((8, 4), 16u8), 0.0, 4.0, 0.5, 0.5, 255).unwrap();
        let chain = ResolutionChain::new(vec![high], towards_origin());
        let mut accumulation = grid(Array2::from_elem((4, 4), 5.0));
        let seed = Coord { x: 0.25, y: 3.75 };

        let inputs = DelineationInputs {
            flow_direction: &chain,
            flow_accumulation: &accumulation,
            accum_threshold: 20.0,
            flow_area: None,
        };
        let ws = delineate(seed, &inputs, &GeoVectorOps).unwrap();
        assert_eq!(ws.resolution, Resolution::High(0));
        assert_eq!(ws.mask.metadata().width, 4);
        assert_eq!(ws.mask.metadata().height, 8);
        // the top row of fine cells drains west into the seed
        assert_eq!(ws.cell_count(), 4);
        assert_relative_eq!(ws.area(), 1.0);

        accumulation = grid(Array2::from_elem((4, 4), 500.0));
        let inputs = DelineationInputs {
            flow_direction: &chain,
            flow_accumulation: &accumulation,
            accum_threshold: 20.0,
            flow_area: None,
        };
        let ws = delineate(seed, &inputs, &GeoVectorOps).unwrap();
        assert_eq!(ws.resolution, Resolution::Fallback);
        assert_eq!(ws.cell_count(), 16);
    }

    #[test]
    fn test_missing_accumulation_uses_fallback() {
        let high = Raster::from_array(Array2::from_elem((8, 4), 16u8), 0.0, 4.0, 0.5, 0.5, 255).unwrap();
        let chain = ResolutionChain::new(vec![high], towards_origin());
        let accumulation = grid(Array2::from_elem((4, 4), -1.0));
        let inputs = DelineationInputs {
            flow_direction: &chain,
            flow_accumulation: &accumulation,
            accum_threshold: 20.0,
            flow_area: None,
        };
        let ws = delineate(Coord { x: 0.25, y: 3.75 }, &inputs, &GeoVectorOps).unwrap();
        assert_eq!(ws.resolution, Resolution::Fallback);
    }

    #[test]
    fn test_seed_errors() {
        let chain = ResolutionChain::single(d8(array![[255, 1], [1, 1]]));
        let accumulation = grid(Array2::from_elem((2, 2), 100.0));
        let inputs = DelineationInputs {
            flow_direction: &chain,
            flow_accumulation: &accumulation,
            accum_threshold: 20.0,
            flow_area: None,
        };
        let nodata = delineate(Coord { x: 0.5, y: 1.5 }, &inputs, &GeoVectorOps);
        assert!(matches!(nodata, Err(Error::NoFlowData { pixel }) if pixel == PixelCoord::new(0, 0)));
        let outside = delineate(Coord { x: 10.0, y: 1.5 }, &inputs, &GeoVectorOps);
        assert!(matches!(outside, Err(Error::OutOfBounds { .. })));
    }

    #[test]
    fn test_flow_area_snaps_to_flow_line() {
        // two basins: columns 0-1 drain into column 1, columns 2-3 into column 2
        let chain = ResolutionChain::single(d8(array![[1, 0, 0, 16]]));
        let accumulation = grid(array![[1.0, 2.0, 2.0, 1.0]]);
        let lake = grid(array![[1.0, 1.0, -1.0, -1.0]]);
        let line = MultiLineString::new(vec![LineString::from(vec![(2.5, 0.0), (2.5, 1.0)])]);
        let seed = Coord { x: 1.5, y: 0.5 };

        let without = DelineationInputs {
            flow_direction: &chain,
            flow_accumulation: &accumulation,
            accum_threshold: 20.0,
            flow_area: None,
        };
        assert_eq!(delineate(seed, &without, &GeoVectorOps).unwrap().cell_count(), 2);

        let with = DelineationInputs {
            flow_area: Some(FlowArea { raster: &lake, flow_line: &line }),
            ..without
        };
        let ws = delineate(seed, &with, &GeoVectorOps).unwrap();
        assert_eq!(ws.seeds, vec![PixelCoord::new(1, 0), PixelCoord::new(2, 0)]);
        assert_eq!(ws.snapped, Some(Coord { x: 2.5, y: 0.5 }));
        assert_eq!(ws.cell_count(), 4);
        assert_relative_eq!(ws.area(), 4.0);
        assert_relative_eq!(ws.perimeter(), 10.0);

        // outside the flow area nothing is snapped
        let ws = delineate(Coord { x: 3.5, y: 0.5 }, &with, &GeoVectorOps).unwrap();
        assert_eq!(ws.snapped, None);
        assert_eq!(ws.seeds, vec![PixelCoord::new(3, 0)]);
        assert_eq!(ws.cell_count(), 1);
    }

    #[test]
    fn test_mask_exports_as_raster() {
        let raster = towards_origin();
        let mask = upstream_mask(&raster, &[PixelCoord::new(1, 1)]);
        let out = mask.to_raster().unwrap();
        assert_eq!(out.metadata().nodata, 0.0);
        assert_eq!(out.metadata().width, raster.metadata().width);
        assert_eq!(out.data(), mask.data());
    }
}
